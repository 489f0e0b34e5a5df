//! Fixed-width binary encoding of log records.
//!
//! Each record occupies one `RECORD_SIZE` slot laid out like the C writer's
//! `struct { uint32_t tag; union { ... } }` on a 64-bit little-endian host:
//! the tag, four bytes of padding, then the payload fields at natural
//! alignment, zero-filled to the end of the slot. Fixed slots are what make
//! backward traversal possible.

use crate::record::{LogRecord, RecordKind};
use aliastrace_core::{Address, CoreError, CoreResult, ValueId};
use bytes::{Buf, BufMut};

/// Size of one record slot in bytes
pub const RECORD_SIZE: usize = 32;

/// Offset of the payload within a slot
const PAYLOAD_OFFSET: usize = 8;

/// Encode a record into its slot
#[must_use]
pub fn encode_record(record: &LogRecord) -> [u8; RECORD_SIZE] {
    let mut slot = [0u8; RECORD_SIZE];
    let mut buf = &mut slot[..];
    buf.put_u32_le(record.kind().tag());
    buf.put_u32_le(0);

    match *record {
        LogRecord::MemAlloc {
            address,
            bound,
            allocated_by,
        } => {
            buf.put_u64_le(address.as_u64());
            buf.put_u64_le(bound);
            buf.put_u32_le(ValueId::to_wire(allocated_by));
        }
        LogRecord::TopLevel {
            pointer,
            pointee,
            loaded_from,
        } => {
            buf.put_u32_le(pointer.as_u32());
            buf.put_u32_le(0);
            buf.put_u64_le(pointee.as_u64());
            buf.put_u64_le(loaded_from.as_u64());
        }
        LogRecord::Store {
            instruction,
            pointer_address,
            pointee,
        } => {
            buf.put_u32_le(instruction.as_u32());
            buf.put_u32_le(0);
            buf.put_u64_le(pointer_address.as_u64());
            buf.put_u64_le(pointee.as_u64());
        }
        LogRecord::Call { instruction } | LogRecord::Return { instruction } => {
            buf.put_u32_le(instruction.as_u32());
        }
        LogRecord::BasicBlock { block } => buf.put_u32_le(block.as_u32()),
        LogRecord::Enter { function } => buf.put_u32_le(function.as_u32()),
    }

    slot
}

/// Decode one slot. `offset` is the slot's byte position, used for errors.
///
/// # Errors
///
/// Returns `CorruptLog` if the slot is short or the tag is unknown
pub fn decode_record(slot: &[u8], offset: u64) -> CoreResult<LogRecord> {
    if slot.len() < RECORD_SIZE {
        return Err(CoreError::corrupt(
            offset,
            format!("truncated record: {} of {} bytes", slot.len(), RECORD_SIZE),
        ));
    }

    let mut buf = &slot[..RECORD_SIZE];
    let tag = buf.get_u32_le();
    let kind = RecordKind::from_tag(tag)
        .ok_or_else(|| CoreError::corrupt(offset, format!("unknown record tag {}", tag)))?;
    buf.advance(PAYLOAD_OFFSET - 4);

    let record = match kind {
        RecordKind::MemAlloc => {
            let address = Address::new(buf.get_u64_le());
            let bound = buf.get_u64_le();
            let allocated_by = ValueId::from_wire(buf.get_u32_le());
            LogRecord::MemAlloc {
                address,
                bound,
                allocated_by,
            }
        }
        RecordKind::TopLevel => {
            let pointer = ValueId::new(buf.get_u32_le());
            buf.advance(4);
            let pointee = Address::new(buf.get_u64_le());
            let loaded_from = Address::new(buf.get_u64_le());
            LogRecord::TopLevel {
                pointer,
                pointee,
                loaded_from,
            }
        }
        RecordKind::Store => {
            let instruction = ValueId::new(buf.get_u32_le());
            buf.advance(4);
            let pointer_address = Address::new(buf.get_u64_le());
            let pointee = Address::new(buf.get_u64_le());
            LogRecord::Store {
                instruction,
                pointer_address,
                pointee,
            }
        }
        RecordKind::Call => LogRecord::Call {
            instruction: ValueId::new(buf.get_u32_le()),
        },
        RecordKind::Return => LogRecord::Return {
            instruction: ValueId::new(buf.get_u32_le()),
        },
        RecordKind::BasicBlock => LogRecord::BasicBlock {
            block: ValueId::new(buf.get_u32_le()),
        },
        RecordKind::Enter => LogRecord::Enter {
            function: ValueId::new(buf.get_u32_le()),
        },
    };

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mem_alloc_layout() {
        let slot = encode_record(&LogRecord::MemAlloc {
            address: Address::new(0x1122_3344_5566_7788),
            bound: 16,
            allocated_by: Some(ValueId::new(5)),
        });
        assert_eq!(&slot[0..4], &0u32.to_le_bytes());
        assert_eq!(&slot[8..16], &0x1122_3344_5566_7788u64.to_le_bytes());
        assert_eq!(&slot[16..24], &16u64.to_le_bytes());
        assert_eq!(&slot[24..28], &5u32.to_le_bytes());
        assert_eq!(&slot[28..32], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_top_level_layout() {
        let slot = encode_record(&LogRecord::TopLevel {
            pointer: ValueId::new(9),
            pointee: Address::new(0x40),
            loaded_from: Address::new(0x80),
        });
        assert_eq!(&slot[0..4], &1u32.to_le_bytes());
        assert_eq!(&slot[8..12], &9u32.to_le_bytes());
        assert_eq!(&slot[16..24], &0x40u64.to_le_bytes());
        assert_eq!(&slot[24..32], &0x80u64.to_le_bytes());
    }

    #[test]
    fn test_external_allocation_sentinel() {
        let record = LogRecord::MemAlloc {
            address: Address::new(0x7fff_0000),
            bound: 64,
            allocated_by: None,
        };
        let slot = encode_record(&record);
        assert_eq!(&slot[24..28], &u32::MAX.to_le_bytes());
        assert_eq!(decode_record(&slot, 0).unwrap(), record);
    }

    #[test]
    fn test_decode_unknown_tag() {
        let mut slot = [0u8; RECORD_SIZE];
        slot[0] = 42;
        let err = decode_record(&slot, 96).unwrap_err();
        assert_eq!(err, CoreError::corrupt(96, "unknown record tag 42"));
    }

    #[test]
    fn test_decode_short_slot() {
        let slot = [0u8; 12];
        let result = decode_record(&slot, 0);
        assert!(matches!(result, Err(CoreError::CorruptLog { offset: 0, .. })));
    }

    fn arb_record() -> impl Strategy<Value = LogRecord> {
        prop_oneof![
            (any::<u64>(), any::<u64>(), any::<Option<u32>>()).prop_map(|(a, b, v)| {
                LogRecord::MemAlloc {
                    address: Address::new(a),
                    bound: b,
                    allocated_by: v.filter(|v| *v != u32::MAX).map(ValueId::new),
                }
            }),
            (any::<u32>(), any::<u64>(), any::<u64>()).prop_map(|(p, a, l)| {
                LogRecord::TopLevel {
                    pointer: ValueId::new(p),
                    pointee: Address::new(a),
                    loaded_from: Address::new(l),
                }
            }),
            (any::<u32>(), any::<u64>(), any::<u64>()).prop_map(|(i, p, a)| LogRecord::Store {
                instruction: ValueId::new(i),
                pointer_address: Address::new(p),
                pointee: Address::new(a),
            }),
            any::<u32>().prop_map(|i| LogRecord::Call {
                instruction: ValueId::new(i)
            }),
            any::<u32>().prop_map(|i| LogRecord::Return {
                instruction: ValueId::new(i)
            }),
            any::<u32>().prop_map(|b| LogRecord::BasicBlock {
                block: ValueId::new(b)
            }),
            any::<u32>().prop_map(|f| LogRecord::Enter {
                function: ValueId::new(f)
            }),
        ]
    }

    proptest::proptest! {
        #[test]
        fn prop_decode_inverts_encode(record in arb_record()) {
            let slot = encode_record(&record);
            prop_assert_eq!(decode_record(&slot, 0).unwrap(), record);
        }
    }
}
