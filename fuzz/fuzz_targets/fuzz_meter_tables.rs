#![no_main]

use libfuzzer_sys::fuzz_target;
use scs_rs::display::{format_display_value, DisplayFormats, DisplayLists};
use scs_rs::payload::bcd::{fixed_bcd_to_string, floating_bcd_to_string};
use scs_rs::tou::{Season, TouEventCollection};

fuzz_target!(|data: &[u8]| {
    let mut calendar = TouEventCollection::decode(data);
    calendar.sort();
    let _ = calendar.add_first_start_date();
    let _ = calendar.truncate_to_fit(data.len() / 2);
    let _ = calendar.expiration_date();

    let _ = Season::decode(data, false);
    let _ = Season::decode(data, true);
    let _ = DisplayLists::parse(data);

    if data.len() >= 10 {
        let mut block = [0u8; 6];
        block.copy_from_slice(&data[..6]);
        let formats = DisplayFormats::decode(&block);
        let raw = fixed_bcd_to_string(&data[6..], 2);
        let _ = format_display_value(&raw, &formats.energy);
        let raw = floating_bcd_to_string(&data[6..10], 4);
        let _ = format_display_value(&raw, &formats.demand);
    }
});
