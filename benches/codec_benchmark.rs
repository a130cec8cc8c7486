use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scs_rs::display::{format_display_value, DisplayFormat, DisplayFormatFlags};
use scs_rs::payload::bcd::{fixed_bcd_to_string, floating_bcd_to_string, string_to_floating_bcd};
use scs_rs::scs::frame::{decode_data_packet, pack_data_packet};
use scs_rs::tou::TouEventCollection;

fn benchmark_bcd(c: &mut Criterion) {
    let energy = [0x00, 0x12, 0x34, 0x56, 0x78, 0x90, 0x00];
    let demand = [0x30, 0x01, 0x23, 0x45];

    c.bench_function("fixed_bcd_to_string", |b| {
        b.iter(|| fixed_bcd_to_string(black_box(&energy), 4))
    });
    c.bench_function("floating_bcd_to_string", |b| {
        b.iter(|| floating_bcd_to_string(black_box(&demand), 4))
    });
    c.bench_function("string_to_floating_bcd", |b| {
        b.iter(|| string_to_floating_bcd(black_box("12.345"), 4))
    });
}

fn benchmark_data_packet(c: &mut Criterion) {
    let payload: Vec<u8> = (0..64).collect();
    let packet = pack_data_packet(&payload);

    c.bench_function("decode_data_packet", |b| {
        b.iter(|| {
            let result = decode_data_packet(black_box(&packet), payload.len());
            let _ = black_box(result);
        })
    });
}

fn benchmark_tou_calendar(c: &mut Criterion) {
    // Ten years, each with a start year word and five date events
    let mut image = Vec::new();
    for year in 0..10u16 {
        for word in [0x1018 + year, 0x0021, 0x0541, 0x2069, 0x2263, 0x3199] {
            image.extend_from_slice(&word.to_be_bytes());
        }
    }
    image.extend_from_slice(&[0xFF, 0xFF]);

    c.bench_function("tou_calendar_decode_sort", |b| {
        b.iter(|| {
            let mut calendar = TouEventCollection::decode(black_box(&image));
            calendar.sort();
            black_box(calendar)
        })
    });
}

fn benchmark_display_format(c: &mut Criterion) {
    let format = DisplayFormat::new(
        5,
        2,
        DisplayFormatFlags::FLOATING_DECIMAL | DisplayFormatFlags::LEADING_ZEROS,
    );

    c.bench_function("format_display_value", |b| {
        b.iter(|| format_display_value(black_box("001234.56789000"), &format))
    });
}

criterion_group!(
    benches,
    benchmark_bcd,
    benchmark_data_packet,
    benchmark_tou_calendar,
    benchmark_display_format
);
criterion_main!(benches);
