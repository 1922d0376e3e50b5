//! Schema-driven event decoding.
//!
//! Turns a raw log plus the ABI schema of exactly one event kind into a
//! typed `BridgeEvent`. The two deployed contracts name semantically
//! identical fields inconsistently (`token` vs `underlying_token`,
//! `recipient` vs `to`), so fields resolve by canonical name first, then
//! through a fixed alias table. Positional recovery is a degraded last
//! resort and is flagged on the result.

use alloy::dyn_abi::{DynSolValue, EventExt};
use alloy::json_abi::Event;
use alloy::primitives::{Address, U256};
use alloy::rpc::types::Log;

use crate::error::DecodeError;
use crate::types::{BridgeEvent, Chain, EventKind};

/// Canonical field names and the aliases the deployed contracts use.
const TOKEN_ALIASES: &[&str] = &["token", "underlying_token"];
const RECIPIENT_ALIASES: &[&str] = &["recipient", "to"];
const AMOUNT_ALIASES: &[&str] = &["amount", "value"];

/// Decode one raw log against an event schema. Pure over its inputs.
pub fn decode(
    chain: Chain,
    kind: EventKind,
    log: &Log,
    schema: &Event,
) -> Result<BridgeEvent, DecodeError> {
    let topics = log.topics();
    if topics.is_empty() {
        return Err(DecodeError::MissingTopics);
    }

    let expected = schema.selector();
    if topics[0] != expected {
        return Err(DecodeError::SchemaMismatch {
            expected: format!("{expected}"),
            got: format!("{}", topics[0]),
        });
    }

    // Provenance is required for deduplication; a log without it is dropped.
    let tx_hash = log
        .transaction_hash
        .ok_or(DecodeError::MissingProvenance("transaction hash"))?;
    let block_number = log
        .block_number
        .ok_or(DecodeError::MissingProvenance("block number"))?;
    let log_index = log
        .log_index
        .ok_or(DecodeError::MissingProvenance("log index"))?;

    let decoded = schema
        .decode_log_parts(topics.iter().copied(), log.data().data.as_ref(), true)
        .map_err(|e| DecodeError::Abi(e.to_string()))?;

    // Reassemble (name, value) pairs in declaration order. Indexed and
    // non-indexed params come back in two separate vectors.
    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut fields: Vec<(String, DynSolValue)> = Vec::with_capacity(schema.inputs.len());
    for input in &schema.inputs {
        let value = if input.indexed {
            indexed.next()
        } else {
            body.next()
        };
        match value {
            Some(value) => fields.push((input.name.clone(), value)),
            None => return Err(DecodeError::Abi("schema/value arity mismatch".into())),
        }
    }

    let named = NamedFields(&fields);
    let token = named.address(TOKEN_ALIASES)?;
    let recipient = named.address(RECIPIENT_ALIASES)?;
    let amount = named.uint(AMOUNT_ALIASES)?;

    let (token, recipient, amount, via_positional) = match (token, recipient, amount) {
        (Some(token), Some(recipient), Some(amount)) => (token, recipient, amount, false),
        _ => positional_fallback(&fields)?,
    };

    if amount.is_zero() {
        return Err(DecodeError::ZeroAmount);
    }

    Ok(BridgeEvent {
        chain,
        kind,
        token,
        recipient,
        amount,
        tx_hash,
        block_number,
        log_index,
        via_positional,
    })
}

struct NamedFields<'a>(&'a [(String, DynSolValue)]);

impl NamedFields<'_> {
    fn resolve(&self, aliases: &[&'static str]) -> Option<(&'static str, &DynSolValue)> {
        // Canonical name wins over aliases, declaration order breaks ties.
        aliases.iter().find_map(|alias| {
            self.0
                .iter()
                .find(|(name, _)| name == alias)
                .map(|(_, value)| (*alias, value))
        })
    }

    /// `Ok(None)` when no alias matches. A matching name with the wrong ABI
    /// type is a `TypeMismatch`, not a candidate for positional recovery.
    fn address(&self, aliases: &[&'static str]) -> Result<Option<Address>, DecodeError> {
        match self.resolve(aliases) {
            None => Ok(None),
            Some((name, value)) => value
                .as_address()
                .map(Some)
                .ok_or(DecodeError::TypeMismatch(name)),
        }
    }

    fn uint(&self, aliases: &[&'static str]) -> Result<Option<U256>, DecodeError> {
        match self.resolve(aliases) {
            None => Ok(None),
            Some((name, value)) => value
                .as_uint()
                .map(|(v, _)| Some(v))
                .ok_or(DecodeError::TypeMismatch(name)),
        }
    }
}

/// Degraded recovery for schemas whose params carry no usable names: the
/// first two address-typed values are taken as (token, recipient) and the
/// first unsigned integer as the amount.
fn positional_fallback(
    fields: &[(String, DynSolValue)],
) -> Result<(Address, Address, U256, bool), DecodeError> {
    let mut addresses = fields.iter().filter_map(|(_, v)| v.as_address());
    let token = addresses.next().ok_or(DecodeError::FieldNotFound("token"))?;
    let recipient = addresses
        .next()
        .ok_or(DecodeError::FieldNotFound("recipient"))?;
    let amount = fields
        .iter()
        .find_map(|(_, v)| v.as_uint())
        .map(|(v, _)| v)
        .ok_or(DecodeError::FieldNotFound("amount"))?;
    Ok((token, recipient, amount, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData, B256};

    /// Build an event schema from (name, type, indexed) triples.
    fn schema(event_name: &str, params: &[(&str, &str, bool)]) -> Event {
        let inputs: Vec<serde_json::Value> = params
            .iter()
            .map(|(name, ty, indexed)| {
                serde_json::json!({
                    "name": name,
                    "type": ty,
                    "indexed": indexed,
                    "internalType": ty,
                })
            })
            .collect();
        serde_json::from_value(serde_json::json!({
            "type": "event",
            "name": event_name,
            "inputs": inputs,
            "anonymous": false,
        }))
        .expect("valid event json")
    }

    fn address_topic(addr: Address) -> B256 {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(addr.as_slice());
        B256::from(word)
    }

    fn raw_log(topics: Vec<B256>, data: Vec<u8>, block: u64, log_index: u64) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: Address::repeat_byte(0x01),
                data: LogData::new_unchecked(topics, Bytes::from(data)),
            },
            block_hash: None,
            block_number: Some(block),
            block_timestamp: None,
            transaction_hash: Some(B256::repeat_byte(0x77)),
            transaction_index: None,
            log_index: Some(log_index),
            removed: false,
        }
    }

    const TOKEN: Address = Address::repeat_byte(0xAA);
    const RECIPIENT: Address = Address::repeat_byte(0xBB);

    fn amount_word(amount: u64) -> Vec<u8> {
        U256::from(amount).to_be_bytes::<32>().to_vec()
    }

    /// Deposit(address indexed token, address indexed recipient, uint256 amount)
    fn deposit_schema() -> Event {
        schema(
            "Deposit",
            &[
                ("token", "address", true),
                ("recipient", "address", true),
                ("amount", "uint256", false),
            ],
        )
    }

    fn deposit_log(amount: u64) -> Log {
        let s = deposit_schema();
        raw_log(
            vec![s.selector(), address_topic(TOKEN), address_topic(RECIPIENT)],
            amount_word(amount),
            102,
            0,
        )
    }

    #[test]
    fn test_decode_deposit_by_name() {
        let event = decode(Chain::Source, EventKind::Deposit, &deposit_log(1000), &deposit_schema())
            .expect("decodes");
        assert_eq!(event.token, TOKEN);
        assert_eq!(event.recipient, RECIPIENT);
        assert_eq!(event.amount, U256::from(1000u64));
        assert_eq!(event.block_number, 102);
        assert!(!event.via_positional);
    }

    #[test]
    fn test_alias_robustness() {
        // Same semantics, the destination contract's naming.
        let unwrap_schema = schema(
            "Unwrap",
            &[
                ("underlying_token", "address", true),
                ("to", "address", true),
                ("amount", "uint256", false),
            ],
        );
        let log = raw_log(
            vec![
                unwrap_schema.selector(),
                address_topic(TOKEN),
                address_topic(RECIPIENT),
            ],
            amount_word(1000),
            102,
            0,
        );
        let aliased = decode(Chain::Destination, EventKind::Unwrap, &log, &unwrap_schema)
            .expect("decodes");

        let canonical =
            decode(Chain::Source, EventKind::Deposit, &deposit_log(1000), &deposit_schema())
                .expect("decodes");

        assert_eq!(aliased.token, canonical.token);
        assert_eq!(aliased.recipient, canonical.recipient);
        assert_eq!(aliased.amount, canonical.amount);
        assert!(!aliased.via_positional);
    }

    #[test]
    fn test_canonical_name_wins_over_alias() {
        // Both "recipient" and "to" present; the canonical name is used.
        let s = schema(
            "Deposit",
            &[
                ("token", "address", true),
                ("recipient", "address", true),
                ("to", "address", true),
                ("amount", "uint256", false),
            ],
        );
        let other = Address::repeat_byte(0xCC);
        let log = raw_log(
            vec![
                s.selector(),
                address_topic(TOKEN),
                address_topic(RECIPIENT),
                address_topic(other),
            ],
            amount_word(5),
            10,
            0,
        );
        let event = decode(Chain::Source, EventKind::Deposit, &log, &s).expect("decodes");
        assert_eq!(event.recipient, RECIPIENT);
    }

    #[test]
    fn test_positional_fallback_flags_result() {
        // Anonymous-ish schema: no recognizable names at all.
        let s = schema(
            "Deposit",
            &[
                ("arg0", "address", true),
                ("arg1", "address", true),
                ("arg2", "uint256", false),
            ],
        );
        let log = raw_log(
            vec![s.selector(), address_topic(TOKEN), address_topic(RECIPIENT)],
            amount_word(9),
            10,
            0,
        );
        let event = decode(Chain::Source, EventKind::Deposit, &log, &s).expect("decodes");
        assert!(event.via_positional);
        assert_eq!(event.token, TOKEN);
        assert_eq!(event.recipient, RECIPIENT);
        assert_eq!(event.amount, U256::from(9u64));
    }

    #[test]
    fn test_schema_mismatch() {
        let s = deposit_schema();
        let log = raw_log(
            vec![
                B256::repeat_byte(0xEE),
                address_topic(TOKEN),
                address_topic(RECIPIENT),
            ],
            amount_word(1),
            10,
            0,
        );
        let err = decode(Chain::Source, EventKind::Deposit, &log, &s).unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_no_topics() {
        let s = deposit_schema();
        let log = raw_log(vec![], vec![], 10, 0);
        assert_eq!(
            decode(Chain::Source, EventKind::Deposit, &log, &s).unwrap_err(),
            DecodeError::MissingTopics
        );
    }

    #[test]
    fn test_named_field_with_wrong_type_is_rejected() {
        // "amount" present but address-typed; decoding fails rather than
        // silently recovering by position.
        let s = schema(
            "Deposit",
            &[
                ("token", "address", true),
                ("recipient", "address", true),
                ("amount", "address", false),
            ],
        );
        let log = raw_log(
            vec![s.selector(), address_topic(TOKEN), address_topic(RECIPIENT)],
            address_topic(Address::repeat_byte(0xCC)).as_slice().to_vec(),
            10,
            0,
        );
        let err = decode(Chain::Source, EventKind::Deposit, &log, &s).unwrap_err();
        assert_eq!(err, DecodeError::TypeMismatch("amount"));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let err = decode(Chain::Source, EventKind::Deposit, &deposit_log(0), &deposit_schema())
            .unwrap_err();
        assert_eq!(err, DecodeError::ZeroAmount);
    }

    #[test]
    fn test_missing_provenance_rejected() {
        let s = deposit_schema();
        let mut log = deposit_log(1);
        log.transaction_hash = None;
        let err = decode(Chain::Source, EventKind::Deposit, &log, &s).unwrap_err();
        assert!(matches!(err, DecodeError::MissingProvenance(_)));
    }

    #[test]
    fn test_five_field_unwrap_schema() {
        // The destination contract emits extra fields; the relay only needs
        // underlying_token, to and amount.
        let s = schema(
            "Unwrap",
            &[
                ("underlying_token", "address", true),
                ("wrapped_token", "address", true),
                ("frm", "address", false),
                ("to", "address", true),
                ("amount", "uint256", false),
            ],
        );
        let wrapped = Address::repeat_byte(0xDD);
        let sender = Address::repeat_byte(0xEE);
        let mut data = Vec::new();
        data.extend(address_topic(sender).as_slice()); // frm, non-indexed
        data.extend(amount_word(777));
        let log = raw_log(
            vec![
                s.selector(),
                address_topic(TOKEN),
                address_topic(wrapped),
                address_topic(RECIPIENT),
            ],
            data,
            50,
            3,
        );
        let event = decode(Chain::Destination, EventKind::Unwrap, &log, &s).expect("decodes");
        assert_eq!(event.token, TOKEN);
        assert_eq!(event.recipient, RECIPIENT);
        assert_eq!(event.amount, U256::from(777u64));
        assert!(!event.via_positional);
    }
}
