//! End-to-end scenarios over the public API, as opposed to the per-module
//! unit tests that live alongside each piece of the codec.

use crate::DecodeOptions;
use crate::EncodeOptions;
use crate::Error;
use crate::Extensions;
use crate::FileStream;
use crate::Stream;
use crate::Value;
use crate::decode;
use crate::encode;

fn roundtrip(v: &Value) {
    let bytes = encode(v, &EncodeOptions::default()).unwrap();
    let back = decode(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(*v, back, "value did not round-trip: {v:?}");
}

#[test]
fn scalars_roundtrip() {
    roundtrip(&Value::Null);
    roundtrip(&Value::Bool(true));
    roundtrip(&Value::Bool(false));
    roundtrip(&Value::UInt(0));
    roundtrip(&Value::UInt(u64::MAX));
    roundtrip(&Value::NInt(-1));
    roundtrip(&Value::NInt(i64::MIN));
    roundtrip(&Value::F32(1.5));
    roundtrip(&Value::F64(2.25));
    roundtrip(&Value::Str(String::new()));
    roundtrip(&Value::Str("hello, world".to_string()));
    roundtrip(&Value::Bin(vec![]));
    roundtrip(&Value::Bin(vec![0, 1, 2, 3, 255]));
}

#[test]
fn nan_does_not_roundtrip_as_equal() {
    let nan = Value::F64(f64::NAN);
    let bytes = encode(&nan, &EncodeOptions::default()).unwrap();
    let back = decode(&bytes, &DecodeOptions::default()).unwrap();
    // bit pattern survives the wire, but NaN != NaN structurally
    assert_ne!(nan, back);
    if let Value::F64(back) = back {
        assert!(back.is_nan());
    } else {
        panic!("expected F64 back");
    }
}

#[test]
fn containers_roundtrip() {
    roundtrip(&Value::empty_array());
    roundtrip(&Value::array(vec![Value::UInt(1), Value::Str("two".into()), Value::Null]));
    roundtrip(&Value::empty_map());
    roundtrip(&Value::map(vec![
        (Value::Str("a".into()), Value::UInt(1)),
        (Value::Str("b".into()), Value::Bool(true)),
    ]));

    let nested = Value::array(vec![Value::array(vec![Value::array(vec![Value::UInt(42)])])]);
    roundtrip(&nested);
}

#[test]
fn integer_boundaries_pick_minimal_tag() {
    let cases: &[(u64, u8)] = &[
        (0, 0x00),
        (127, 0x7f),
        (128, 0xcc),     // uint8
        (255, 0xcc),
        (256, 0xcd),     // uint16
        (65535, 0xcd),
        (65536, 0xce),   // uint32
        (4294967295, 0xce),
        (4294967296, 0xcf), // uint64
    ];
    for (v, expected_tag) in cases {
        let bytes = encode(&Value::UInt(*v), &EncodeOptions::default()).unwrap();
        assert_eq!(bytes[0], *expected_tag, "value {v}");
    }
}

#[test]
fn negative_integer_boundaries_pick_minimal_tag() {
    let cases: &[(i64, u8)] = &[
        (-1, 0xff),
        (-32, 0xe0),
        (-33, 0xd0),   // int8
        (-128, 0xd0),
        (-129, 0xd1),  // int16
        (-32768, 0xd1),
        (-32769, 0xd2), // int32
        (-2147483648, 0xd2),
        (-2147483649, 0xd3), // int64
    ];
    for (v, expected_tag) in cases {
        let bytes = encode(&Value::NInt(*v), &EncodeOptions::default()).unwrap();
        assert_eq!(bytes[0], *expected_tag, "value {v}");
    }
}

#[test]
fn string_length_boundaries_pick_minimal_tag() {
    let lens: &[(usize, u8)] = &[(0, 0xa0), (31, 0xbf), (32, 0xd9), (255, 0xd9), (256, 0xda)];
    for (len, expected_tag) in lens {
        let s = "x".repeat(*len);
        let bytes = encode(&Value::Str(s), &EncodeOptions::default()).unwrap();
        assert_eq!(bytes[0], *expected_tag, "len {len}");
    }
}

#[test]
fn array_and_map_length_boundaries_pick_minimal_tag() {
    let a15 = Value::array(vec![Value::Null; 15]);
    let a16 = Value::array(vec![Value::Null; 16]);
    assert_eq!(encode(&a15, &EncodeOptions::default()).unwrap()[0], 0x9f);
    assert_eq!(encode(&a16, &EncodeOptions::default()).unwrap()[0], 0xdc);

    let m15 = Value::map((0..15).map(|i| (Value::UInt(i), Value::Null)).collect());
    let m16 = Value::map((0..16).map(|i| (Value::UInt(i), Value::Null)).collect());
    assert_eq!(encode(&m15, &EncodeOptions::default()).unwrap()[0], 0x8f);
    assert_eq!(encode(&m16, &EncodeOptions::default()).unwrap()[0], 0xde);
}

#[test]
fn ext_payload_length_boundaries_pick_minimal_tag() {
    let cases: &[(usize, u8)] = &[(1, 0xd4), (2, 0xd5), (4, 0xd6), (8, 0xd7), (16, 0xd8), (3, 0xc7)];
    for (len, expected_tag) in cases {
        let bytes = encode(&Value::Ext(1, vec![0u8; *len]), &EncodeOptions::default()).unwrap();
        assert_eq!(bytes[0], *expected_tag, "len {len}");
    }
}

#[test]
fn re_encoding_a_decoded_value_is_byte_identical() {
    let original = Value::array(vec![
        Value::UInt(300),
        Value::Str("round and round".into()),
        Value::map(vec![(Value::Str("k".into()), Value::NInt(-500))]),
    ]);
    let once = encode(&original, &EncodeOptions::default()).unwrap();
    let decoded = decode(&once, &DecodeOptions::default()).unwrap();
    let twice = encode(&decoded, &EncodeOptions::default()).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn cycle_rejection_produces_no_output() {
    let a = Value::empty_array();
    if let Value::Array(rc) = &a {
        rc.borrow_mut().push(a.clone());
    }
    assert!(matches!(
        encode(&a, &EncodeOptions::default()),
        Err(Error::Recursion)
    ));

    let m = Value::empty_map();
    if let Value::Map(rc) = &m {
        rc.borrow_mut().push((Value::UInt(1), m.clone()));
    }
    assert!(matches!(
        encode(&m, &EncodeOptions::default()),
        Err(Error::Recursion)
    ));
}

#[test]
fn shared_but_acyclic_containers_encode_fine() {
    // the same array appearing twice as siblings is not a cycle
    let shared = Value::array(vec![Value::UInt(1)]);
    let outer = Value::array(vec![shared.clone(), shared]);
    assert!(encode(&outer, &EncodeOptions::default()).is_ok());
}

#[test]
fn str_keys_option_is_enforced_on_encode_and_decode() {
    let int_keyed = Value::map(vec![(Value::UInt(1), Value::UInt(2))]);

    // encode({1: 2}, str_keys=True) -> TypeError
    let encode_opts = EncodeOptions {
        str_keys: true,
        ..Default::default()
    };
    assert!(matches!(encode(&int_keyed, &encode_opts), Err(Error::Type(_))));

    // dec(enc({1: 2}), str_keys=True) -> TypeError
    let bytes = encode(&int_keyed, &EncodeOptions::default()).unwrap();
    let decode_opts = DecodeOptions {
        str_keys: true,
        ..Default::default()
    };
    assert!(matches!(decode(&bytes, &decode_opts), Err(Error::Type(_))));

    // without the option, both directions succeed and round-trip
    assert!(encode(&int_keyed, &EncodeOptions::default()).is_ok());
    assert_eq!(decode(&bytes, &DecodeOptions::default()).unwrap(), int_keyed);
}

#[test]
fn extension_type_round_trip_is_mutually_inverse() {
    #[derive(Debug, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }
    impl crate::ExtValue for Point {}

    let mut exts = Extensions::new();
    exts.add::<Point, _, _>(
        9,
        false,
        |p: &Point| Ok([p.x.to_be_bytes(), p.y.to_be_bytes()].concat()),
        |bytes: &[u8]| {
            Ok(Point {
                x: i32::from_be_bytes(bytes[0..4].try_into().unwrap()),
                y: i32::from_be_bytes(bytes[4..8].try_into().unwrap()),
            })
        },
    )
    .unwrap();

    let point = Point { x: -7, y: 42 };
    let mut buf = crate::buffer::Buffer::new();
    let opts = EncodeOptions {
        extensions: Some(&exts),
        ..Default::default()
    };
    crate::encode_host_value(&point, &opts, &mut buf).unwrap();

    let decode_opts = DecodeOptions {
        extensions: Some(&exts),
        ..Default::default()
    };
    let value = decode(buf.as_slice(), &decode_opts).unwrap();
    if let Value::Ext(ext_id, payload) = value {
        assert_eq!(ext_id, 9);
        let back = crate::decode_host_value(ext_id, &payload, &decode_opts).unwrap();
        let back = back.downcast::<Point>().unwrap();
        assert_eq!(*back, point);
    } else {
        panic!("expected Ext value");
    }
}

#[test]
fn literal_scenario_bytes() {
    // 5 -> 0x05
    assert_eq!(encode(&Value::UInt(5), &EncodeOptions::default()).unwrap(), vec![0x05]);
    // -1 -> 0xff
    assert_eq!(encode(&Value::NInt(-1), &EncodeOptions::default()).unwrap(), vec![0xff]);
    // "" -> 0xa0
    assert_eq!(
        encode(&Value::Str(String::new()), &EncodeOptions::default()).unwrap(),
        vec![0xa0]
    );
    // nil -> 0xc0
    assert_eq!(encode(&Value::Null, &EncodeOptions::default()).unwrap(), vec![0xc0]);
    // true -> 0xc3
    assert_eq!(encode(&Value::Bool(true), &EncodeOptions::default()).unwrap(), vec![0xc3]);
    // empty array -> 0x90
    assert_eq!(encode(&Value::empty_array(), &EncodeOptions::default()).unwrap(), vec![0x90]);
    // empty map -> 0x80
    assert_eq!(encode(&Value::empty_map(), &EncodeOptions::default()).unwrap(), vec![0x80]);
    // single-byte bin -> 0xc4 0x01 0xff
    assert_eq!(
        encode(&Value::Bin(vec![0xff]), &EncodeOptions::default()).unwrap(),
        vec![0xc4, 0x01, 0xff]
    );
}

#[test]
fn stream_round_trips_several_values_in_sequence() {
    let mut s = Stream::new();
    let values = vec![Value::UInt(1), Value::Str("two".into()), Value::array(vec![Value::Null])];
    for v in &values {
        s.encode(v, &EncodeOptions::default()).unwrap();
    }

    let mut reader = Stream::new();
    reader.feed(s.as_bytes());
    for v in &values {
        assert_eq!(&reader.decode(&DecodeOptions::default()).unwrap(), v);
    }
}

#[test]
fn file_stream_two_handles_on_same_path_read_independently() {
    let mut path = std::env::temp_dir();
    path.push(format!("msgpack_codec_scenario_{}", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
        let mut writer = FileStream::open(&path).unwrap();
        writer.encode(&Value::UInt(10), &EncodeOptions::default()).unwrap();
        writer.encode(&Value::UInt(20), &EncodeOptions::default()).unwrap();
    }

    let mut a = FileStream::open(&path).unwrap();
    let mut b = FileStream::open(&path).unwrap();
    assert_eq!(a.decode(&DecodeOptions::default()).unwrap(), Value::UInt(10));
    assert_eq!(b.decode(&DecodeOptions::default()).unwrap(), Value::UInt(10));
    assert_eq!(a.decode(&DecodeOptions::default()).unwrap(), Value::UInt(20));
    assert_eq!(b.decode(&DecodeOptions::default()).unwrap(), Value::UInt(20));

    let _ = std::fs::remove_file(&path);
}
