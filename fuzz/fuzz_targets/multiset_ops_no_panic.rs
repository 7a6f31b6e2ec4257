// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use edcp_stats::OrderedMultiset;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);
    let mut set = OrderedMultiset::new();
    let mut reference: Vec<f64> = Vec::new();

    let steps = common::bounded(cursor.next_u8(), 1, 256);
    for _ in 0..steps {
        let op = cursor.next_u8();
        let value = f64::from(cursor.next_i16()) / 8.0;

        match op % 4 {
            0 | 1 => {
                set.insert(value);
                reference.push(value);
            }
            2 => {
                let removed = set.remove(value);
                let position = reference.iter().position(|v| *v == value);
                assert_eq!(removed, position.is_some());
                if let Some(position) = position {
                    reference.swap_remove(position);
                }
            }
            _ => {
                if !reference.is_empty() {
                    let target = reference[usize::from(op) % reference.len()];
                    assert!(set.remove(target));
                    let position = reference
                        .iter()
                        .position(|v| *v == target)
                        .expect("value drawn from reference");
                    reference.swap_remove(position);
                }
            }
        }

        assert!(set.as_slice().windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(set.len(), reference.len());
        assert_eq!(set.median().is_none(), reference.is_empty());
    }
});
