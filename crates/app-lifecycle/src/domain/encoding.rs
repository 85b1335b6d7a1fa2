//! # Canonical Transaction Encoding
//!
//! Transactions travel as msgpack maps with lexicographically sorted keys and
//! every zero or empty field omitted. Identifiers and signatures are computed
//! over exactly these bytes, so two encoders that disagree on a single byte
//! disagree on the transaction id.
//!
//! | Prefix | Hashed / signed message |
//! |--------|-------------------------|
//! | `TX`   | canonical transaction   |
//! | `TG`   | `{"txlist": [id, ...]}` |

use crate::domain::entities::{
    AppCallFields, PaymentFields, SignedEnvelope, TransactionBody, TransactionEnvelope,
    TransactionHeader, SIGNATURE_LEN,
};
use crate::domain::value_objects::{
    BoxReference, CompiledProgram, OnComplete, ProgramRole, StateSchema,
};
use crate::errors::DecodeError;
use rmpv::Value;
use shared_types::hashing::{TX_GROUP_PREFIX, TX_PREFIX};
use shared_types::{hash_with_prefix, Address, ApplicationId, AssetId, Digest, TransactionId};

// =============================================================================
// ENCODING
// =============================================================================

/// Collects non-empty fields and emits them as a sorted map.
#[derive(Default)]
struct CanonicalMap(Vec<(&'static str, Value)>);

impl CanonicalMap {
    fn uint(mut self, key: &'static str, value: u64) -> Self {
        if value != 0 {
            self.0.push((key, Value::from(value)));
        }
        self
    }

    fn bytes(mut self, key: &'static str, value: &[u8]) -> Self {
        if !value.is_empty() {
            self.0.push((key, Value::Binary(value.to_vec())));
        }
        self
    }

    fn fixed(self, key: &'static str, value: Option<&[u8; 32]>) -> Self {
        match value {
            Some(bytes) if bytes.iter().any(|b| *b != 0) => self.bytes(key, bytes),
            _ => self,
        }
    }

    fn text(mut self, key: &'static str, value: &str) -> Self {
        if !value.is_empty() {
            self.0.push((key, Value::from(value)));
        }
        self
    }

    fn array(mut self, key: &'static str, items: Vec<Value>) -> Self {
        if !items.is_empty() {
            self.0.push((key, Value::Array(items)));
        }
        self
    }

    fn nested(mut self, key: &'static str, map: Value) -> Self {
        if matches!(&map, Value::Map(entries) if !entries.is_empty()) {
            self.0.push((key, map));
        }
        self
    }

    fn build(mut self) -> Value {
        self.0.sort_by(|a, b| a.0.cmp(b.0));
        Value::Map(
            self.0
                .into_iter()
                .map(|(k, v)| (Value::from(k), v))
                .collect(),
        )
    }
}

fn write(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, value).expect("msgpack write to a Vec cannot fail");
    buf
}

fn schema_value(schema: &StateSchema) -> Value {
    CanonicalMap::default()
        .uint("nbs", schema.num_byte_slices)
        .uint("nui", schema.num_uints)
        .build()
}

fn header_fields(map: CanonicalMap, header: &TransactionHeader, type_tag: &str) -> CanonicalMap {
    map.uint("fee", header.fee)
        .uint("fv", header.first_valid)
        .text("gen", &header.genesis_id)
        .fixed("gh", Some(header.genesis_hash.as_bytes()))
        .fixed("grp", header.group.as_ref().map(Digest::as_bytes))
        .uint("lv", header.last_valid)
        .fixed("lx", header.lease.as_ref())
        .bytes("note", &header.note)
        .fixed("rekey", header.rekey_to.as_ref().map(Address::as_bytes))
        .fixed("snd", Some(header.sender.as_bytes()))
        .text("type", type_tag)
}

fn app_call_fields(map: CanonicalMap, fields: &AppCallFields) -> CanonicalMap {
    let boxes = fields
        .boxes
        .iter()
        .map(|b| {
            CanonicalMap::default()
                .uint("i", box_index(fields, b))
                .bytes("n", &b.name)
                .build()
        })
        .collect();

    map.array(
        "apaa",
        fields.app_args.iter().map(|a| Value::Binary(a.clone())).collect(),
    )
    .uint("apan", fields.on_complete.as_u64())
    .bytes(
        "apap",
        fields.approval_program.as_ref().map_or(&[][..], CompiledProgram::bytes),
    )
    .array(
        "apas",
        fields.foreign_assets.iter().map(|a| Value::from(a.0)).collect(),
    )
    .array(
        "apat",
        fields
            .accounts
            .iter()
            .map(|a| Value::Binary(a.as_bytes().to_vec()))
            .collect(),
    )
    .array("apbx", boxes)
    .uint("apep", u64::from(fields.extra_pages))
    .array(
        "apfa",
        fields.foreign_apps.iter().map(|a| Value::from(a.0)).collect(),
    )
    .nested("apgs", schema_value(&fields.global_schema))
    .uint("apid", fields.app_id.0)
    .nested("apls", schema_value(&fields.local_schema))
    .bytes(
        "apsu",
        fields.clear_program.as_ref().map_or(&[][..], CompiledProgram::bytes),
    )
}

/// `i` of a box reference: 0 for the called app, else 1 + position in foreign apps.
fn box_index(fields: &AppCallFields, reference: &BoxReference) -> u64 {
    if reference.app_id.is_none() {
        return 0;
    }
    fields
        .foreign_apps
        .iter()
        .position(|a| *a == reference.app_id)
        .map_or(0, |p| p as u64 + 1)
}

fn payment_fields(map: CanonicalMap, fields: &PaymentFields) -> CanonicalMap {
    map.uint("amt", fields.amount)
        .fixed("close", fields.close_remainder_to.as_ref().map(Address::as_bytes))
        .fixed("rcv", Some(fields.receiver.as_bytes()))
}

/// The transaction as a canonical msgpack map value.
#[must_use]
pub fn transaction_value(tx: &TransactionEnvelope) -> Value {
    let map = header_fields(CanonicalMap::default(), &tx.header, tx.type_tag());
    match &tx.body {
        TransactionBody::ApplicationCall(fields) => app_call_fields(map, fields),
        TransactionBody::Payment(fields) => payment_fields(map, fields),
    }
    .build()
}

/// Canonical msgpack bytes of an unsigned transaction.
#[must_use]
pub fn encode_transaction(tx: &TransactionEnvelope) -> Vec<u8> {
    write(&transaction_value(tx))
}

/// The message an account signs: `"TX" || canonical bytes`.
#[must_use]
pub fn signing_bytes(tx: &TransactionEnvelope) -> Vec<u8> {
    let mut msg = TX_PREFIX.to_vec();
    msg.extend_from_slice(&encode_transaction(tx));
    msg
}

/// `SHA-512/256("TX" || canonical bytes)`.
#[must_use]
pub fn transaction_id(tx: &TransactionEnvelope) -> TransactionId {
    TransactionId(hash_with_prefix(TX_PREFIX, &encode_transaction(tx)))
}

/// Wire form of a signed transaction: `{"sig": .., "txn": ..}`.
#[must_use]
pub fn encode_signed(stx: &SignedEnvelope) -> Vec<u8> {
    write(&Value::Map(vec![
        (Value::from("sig"), Value::Binary(stx.signature.to_vec())),
        (Value::from("txn"), transaction_value(&stx.envelope)),
    ]))
}

/// Concatenated wire forms, as broadcast for a group.
#[must_use]
pub fn encode_signed_group(group: &[SignedEnvelope]) -> Vec<u8> {
    group.iter().flat_map(encode_signed).collect()
}

/// Group id over the member ids, in group order.
#[must_use]
pub fn group_id(ids: &[TransactionId]) -> Digest {
    let txlist = ids
        .iter()
        .map(|id| Value::Binary(id.as_bytes().to_vec()))
        .collect();
    let map = Value::Map(vec![(Value::from("txlist"), Value::Array(txlist))]);
    hash_with_prefix(TX_GROUP_PREFIX, &write(&map))
}

/// Stamps the group id on every member of a multi-transaction group.
///
/// Single transactions carry no group id. Returns the id assigned, if any.
pub fn assign_group(envelopes: &mut [TransactionEnvelope]) -> Option<Digest> {
    for tx in envelopes.iter_mut() {
        tx.header.group = None;
    }
    if envelopes.len() < 2 {
        return None;
    }
    let ids: Vec<_> = envelopes.iter().map(TransactionEnvelope::id).collect();
    let gid = group_id(&ids);
    for tx in envelopes.iter_mut() {
        tx.header.group = Some(gid);
    }
    Some(gid)
}

// =============================================================================
// DECODING
// =============================================================================

fn malformed(reason: impl Into<String>) -> DecodeError {
    DecodeError(reason.into())
}

struct Fields<'a>(&'a [(Value, Value)]);

impl<'a> Fields<'a> {
    fn of(value: &'a Value, what: &str) -> Result<Self, DecodeError> {
        value
            .as_map()
            .map(|m| Self(m.as_slice()))
            .ok_or_else(|| malformed(format!("{what} is not a map")))
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.0
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    fn uint(&self, key: &str) -> Result<u64, DecodeError> {
        self.get(key).map_or(Ok(0), |v| {
            v.as_u64()
                .ok_or_else(|| malformed(format!("`{key}` is not an unsigned integer")))
        })
    }

    fn bytes(&self, key: &str) -> Result<Vec<u8>, DecodeError> {
        self.get(key).map_or(Ok(Vec::new()), |v| {
            v.as_slice()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| malformed(format!("`{key}` is not binary")))
        })
    }

    fn fixed(&self, key: &str) -> Result<Option<[u8; 32]>, DecodeError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => v
                .as_slice()
                .and_then(|b| <[u8; 32]>::try_from(b).ok())
                .map(Some)
                .ok_or_else(|| malformed(format!("`{key}` is not 32 bytes"))),
        }
    }

    fn text(&self, key: &str) -> Result<String, DecodeError> {
        self.get(key).map_or(Ok(String::new()), |v| {
            v.as_str()
                .map(str::to_string)
                .ok_or_else(|| malformed(format!("`{key}` is not a string")))
        })
    }

    fn array(&self, key: &str) -> Result<&'a [Value], DecodeError> {
        self.get(key).map_or(Ok(&[][..]), |v| {
            v.as_array()
                .map(Vec::as_slice)
                .ok_or_else(|| malformed(format!("`{key}` is not an array")))
        })
    }

    fn schema(&self, key: &str) -> Result<StateSchema, DecodeError> {
        match self.get(key) {
            None => Ok(StateSchema::EMPTY),
            Some(v) => {
                let f = Fields::of(v, key)?;
                Ok(StateSchema::new(f.uint("nui")?, f.uint("nbs")?))
            }
        }
    }
}

fn decode_header(f: &Fields<'_>) -> Result<TransactionHeader, DecodeError> {
    Ok(TransactionHeader {
        sender: Address(f.fixed("snd")?.unwrap_or_default()),
        fee: f.uint("fee")?,
        first_valid: f.uint("fv")?,
        last_valid: f.uint("lv")?,
        genesis_id: f.text("gen")?,
        genesis_hash: Digest(f.fixed("gh")?.unwrap_or_default()),
        note: f.bytes("note")?,
        lease: f.fixed("lx")?,
        rekey_to: f.fixed("rekey")?.map(Address),
        group: f.fixed("grp")?.map(Digest),
    })
}

fn program(bytes: Vec<u8>, role: ProgramRole) -> Option<CompiledProgram> {
    (!bytes.is_empty()).then(|| CompiledProgram::from_bytecode(role, bytes))
}

fn decode_app_call(f: &Fields<'_>) -> Result<AppCallFields, DecodeError> {
    let on_complete = f.uint("apan")?;
    let foreign_apps = f
        .array("apfa")?
        .iter()
        .map(|v| v.as_u64().map(ApplicationId).ok_or_else(|| malformed("`apfa` entry")))
        .collect::<Result<Vec<_>, _>>()?;

    let boxes = f
        .array("apbx")?
        .iter()
        .map(|v| {
            let b = Fields::of(v, "box reference")?;
            let app_id = match b.uint("i")? {
                0 => ApplicationId::NONE,
                i => *usize::try_from(i - 1)
                    .ok()
                    .and_then(|i| foreign_apps.get(i))
                    .ok_or_else(|| malformed(format!("box index {i} out of range")))?,
            };
            Ok(BoxReference {
                app_id,
                name: b.bytes("n")?,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;

    Ok(AppCallFields {
        app_id: ApplicationId(f.uint("apid")?),
        on_complete: OnComplete::from_u64(on_complete)
            .ok_or_else(|| malformed(format!("unknown on-complete {on_complete}")))?,
        approval_program: program(f.bytes("apap")?, ProgramRole::Approval),
        clear_program: program(f.bytes("apsu")?, ProgramRole::Clear),
        global_schema: f.schema("apgs")?,
        local_schema: f.schema("apls")?,
        extra_pages: u32::try_from(f.uint("apep")?).map_err(|_| malformed("`apep` overflow"))?,
        app_args: f
            .array("apaa")?
            .iter()
            .map(|v| v.as_slice().map(<[u8]>::to_vec).ok_or_else(|| malformed("`apaa` entry")))
            .collect::<Result<_, _>>()?,
        accounts: f
            .array("apat")?
            .iter()
            .map(|v| {
                v.as_slice()
                    .and_then(Address::from_slice)
                    .ok_or_else(|| malformed("`apat` entry"))
            })
            .collect::<Result<_, _>>()?,
        foreign_apps,
        foreign_assets: f
            .array("apas")?
            .iter()
            .map(|v| v.as_u64().map(AssetId).ok_or_else(|| malformed("`apas` entry")))
            .collect::<Result<_, _>>()?,
        boxes,
    })
}

/// Inverse of [`transaction_value`].
pub fn decode_transaction(value: &Value) -> Result<TransactionEnvelope, DecodeError> {
    let f = Fields::of(value, "transaction")?;
    let header = decode_header(&f)?;
    let body = match f.text("type")?.as_str() {
        "appl" => TransactionBody::ApplicationCall(decode_app_call(&f)?),
        "pay" => TransactionBody::Payment(PaymentFields {
            receiver: Address(f.fixed("rcv")?.unwrap_or_default()),
            amount: f.uint("amt")?,
            close_remainder_to: f.fixed("close")?.map(Address),
        }),
        other => return Err(malformed(format!("unsupported transaction type `{other}`"))),
    };
    Ok(TransactionEnvelope { header, body })
}

/// Splits concatenated signed transactions back into envelopes.
pub fn decode_signed_group(mut bytes: &[u8]) -> Result<Vec<SignedEnvelope>, DecodeError> {
    let mut group = Vec::new();
    while !bytes.is_empty() {
        let value =
            rmpv::decode::read_value(&mut bytes).map_err(|e| malformed(e.to_string()))?;
        let f = Fields::of(&value, "signed transaction")?;
        let signature = f
            .get("sig")
            .and_then(Value::as_slice)
            .and_then(|s| <[u8; SIGNATURE_LEN]>::try_from(s).ok())
            .ok_or_else(|| malformed("missing or short `sig`"))?;
        let envelope =
            decode_transaction(f.get("txn").ok_or_else(|| malformed("missing `txn`"))?)?;
        group.push(SignedEnvelope {
            id: envelope.id(),
            envelope,
            signature,
        });
    }
    if group.is_empty() {
        return Err(malformed("no transactions"));
    }
    Ok(group)
}
