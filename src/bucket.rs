use log::warn;
use serde::Deserialize;

use crate::experiment::{BucketId, VariationId};

/// A deterministic partition of the identifier-hash space into variation assignments.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: BucketId,
    pub seed: i32,
    pub slot_size: i32,
    pub slots: Vec<Slot>,
}

/// A half-open slot range `[start_inclusive, end_exclusive)` assigned to one variation.
///
/// Well-formed buckets partition `[0, slot_size)` without gaps or overlaps; the engine does
/// not verify this, a slot number falling into a gap simply allocates nothing.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub start_inclusive: i32,
    pub end_exclusive: i32,
    pub variation_id: VariationId,
}

impl Slot {
    fn contains(&self, slot_number: i32) -> bool {
        self.start_inclusive <= slot_number && slot_number < self.end_exclusive
    }
}

impl Bucket {
    fn slot(&self, slot_number: i32) -> Option<&Slot> {
        self.slots.iter().find(|slot| slot.contains(slot_number))
    }
}

/// Assign the identifier to a slot of the bucket, or None when no slot covers the computed
/// slot number.
///
/// The assignment is a pure function of `(seed, slot_size, identifier)` and is stable
/// across processes and SDK implementations.
pub(crate) fn bucketing<'a>(bucket: &'a Bucket, identifier: &str) -> Option<&'a Slot> {
    let slot_number = slot_number(bucket.seed, bucket.slot_size, identifier)?;
    bucket.slot(slot_number)
}

fn slot_number(seed: i32, slot_size: i32, identifier: &str) -> Option<i32> {
    if slot_size <= 0 {
        warn!("bucket has non-positive slot size {}", slot_size);
        return None;
    }
    let hash = murmur3_32(identifier.as_bytes(), seed as u32) as i32;
    Some((hash.unsigned_abs() % slot_size as u32) as i32)
}

// MurmurHash3, x86 32-bit variant. The exact bit pattern is shared with the other SDKs and
// the allocation backend, so this must not change.
fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e_2d51;
    const C2: u32 = 0x1b87_3593;

    let mut hash = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        hash ^= k;
        hash = hash.rotate_left(13);
        hash = hash.wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        if tail.len() >= 3 {
            k ^= u32::from(tail[2]) << 16;
        }
        if tail.len() >= 2 {
            k ^= u32::from(tail[1]) << 8;
        }
        k ^= u32::from(tail[0]);
        k = k.wrapping_mul(C1);
        k = k.rotate_left(15);
        k = k.wrapping_mul(C2);
        hash ^= k;
    }

    hash ^= data.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85eb_ca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2_ae35);
    hash ^= hash >> 16;

    hash
}
