// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use edcp_core::{ChangeDetector, ExecutionContext, SeriesView};
use edcp_offline::{EDivisive, EDivisiveConfig, EDivisiveMedians, EdmConfig};
use libfuzzer_sys::fuzz_target;

fn build_value(mode_seed: u8, raw: f64, small: i16) -> f64 {
    match mode_seed % 8 {
        0 => f64::from(small),
        1 => f64::from(small) / 64.0,
        2 => 0.0,
        3 => f64::NAN,
        4 => f64::INFINITY,
        5 => raw.clamp(-1e12, 1e12),
        _ => raw,
    }
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);

    let len = common::bounded(cursor.next_u8(), 0, 48);
    let raw = common::decode_f64_chunks(&cursor.take_padded(len * 8), len);
    let values: Vec<f64> = raw
        .iter()
        .map(|&bits| build_value(cursor.next_u8(), bits, cursor.next_i16()))
        .collect();

    let Ok(view) = SeriesView::new(&values) else {
        return;
    };
    let ctx = ExecutionContext::new();

    let edivisive = EDivisive::new(EDivisiveConfig {
        significance: f64::from(cursor.next_u8().max(1)) / 255.0,
        permutations: common::bounded(cursor.next_u8(), 1, 8),
        seed: u64::from(cursor.next_u8()),
        cancel_check_every: 1,
    });
    if let Ok(detector) = edivisive
        && let Ok(result) = detector.detect(&view, &ctx)
    {
        assert!(
            result
                .change_points
                .iter()
                .all(|cp| cp.index > 0 && cp.index < values.len())
        );
    }

    let edm = EDivisiveMedians::new(EdmConfig {
        min_size: common::bounded(cursor.next_u8(), 1, 8),
        ..EdmConfig::default()
    });
    if let Ok(detector) = edm
        && let Ok(result) = detector.detect(&view, &ctx)
    {
        let indices = result.indices();
        assert!(indices.windows(2).all(|pair| pair[0] < pair[1]));
    }
});
