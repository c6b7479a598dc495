use super::*;

fn roundtrip(v: Value) {
    let buf = encode_to_bytes(&v);
    match decode(&buf).unwrap() {
        Decoded::Complete(got, consumed) => {
            assert_eq!(consumed, buf.len());
            assert_eq!(got, v);
        }
        Decoded::Incomplete => panic!("expected a complete frame"),
    }
}

#[test]
fn roundtrips_simple_string() {
    roundtrip(Value::text("OK"));
}

#[test]
fn roundtrips_error() {
    roundtrip(Value::Error("bad type".into()));
}

#[test]
fn roundtrips_integer() {
    roundtrip(Value::Int(-42));
}

#[test]
fn roundtrips_float() {
    roundtrip(Value::Float(3.5));
}

#[test]
fn roundtrips_bulk_string() {
    roundtrip(Value::bytes(&b"hello world"[..]));
}

#[test]
fn roundtrips_null() {
    roundtrip(Value::Null);
}

#[test]
fn roundtrips_json() {
    roundtrip(Value::Json(serde_json::json!({"a": 1, "b": [1,2,3]})));
}

#[test]
fn roundtrips_nested_array() {
    roundtrip(Value::Array(vec![
        Value::Int(1),
        Value::Array(vec![Value::text("x"), Value::Null]),
        Value::bytes(&b"bin"[..]),
    ]));
}

#[test]
fn roundtrips_map() {
    roundtrip(Value::Map(vec![
        (Value::text("k1"), Value::Int(1)),
        (Value::text("k2"), Value::bytes(&b"v2"[..])),
    ]));
}

#[test]
fn roundtrips_set() {
    roundtrip(Value::Set(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
}

#[test]
fn incomplete_on_truncated_bulk() {
    // a $ frame claiming 5 bytes but only 2 are present
    let buf = b"$5\r\nhe";
    match decode(buf).unwrap() {
        Decoded::Incomplete => {}
        Decoded::Complete(..) => panic!("should not have parsed a truncated frame"),
    }
}

#[test]
fn incomplete_on_missing_crlf_after_tag_line() {
    let buf = b"*2\r\n:1\r\n";
    match decode(buf).unwrap() {
        Decoded::Incomplete => {}
        Decoded::Complete(..) => panic!("second array element hasn't arrived yet"),
    }
}

#[test]
fn corrupt_on_negative_length_below_null_sentinel() {
    let buf = b"$-2\r\n";
    assert!(matches!(decode(buf), Err(ProtocolError::Corrupt(_))));
}

#[test]
fn corrupt_on_bad_integer() {
    let buf = b":notanumber\r\n";
    assert!(matches!(decode(buf), Err(ProtocolError::Corrupt(_))));
}

#[test]
fn unknown_tag_is_not_fatal() {
    let buf = b"!weird\r\n";
    match decode(buf).unwrap() {
        Decoded::Complete(Value::Unknown(raw), consumed) => {
            assert_eq!(&raw[..], b"!weird");
            assert_eq!(consumed, buf.len());
        }
        _ => panic!("expected an Unknown frame"),
    }
}

#[test]
fn decode_consumes_only_one_frame_leaving_the_rest_buffered() {
    let mut buf = BytesMut::new();
    encode(&Value::Int(1), &mut buf);
    encode(&Value::Int(2), &mut buf);
    match decode(&buf).unwrap() {
        Decoded::Complete(Value::Int(1), consumed) => {
            assert_eq!(&buf[consumed..], b":2\r\n");
        }
        _ => panic!("expected the first integer frame"),
    }
}

#[test]
fn timestamp_formats_without_fractional_seconds() {
    let ts = parse_timestamp("2024-01-02 03:04:05").unwrap();
    assert_eq!(format_timestamp(ts), "2024-01-02 03:04:05");
}

#[test]
fn timestamp_formats_with_fractional_seconds() {
    let ts = parse_timestamp("2024-01-02 03:04:05.250000").unwrap();
    assert_eq!(format_timestamp(ts), "2024-01-02 03:04:05.250000");
}

#[test]
fn encode_bool_has_no_dedicated_tag() {
    let mut buf = BytesMut::new();
    encode_bool(true, &mut buf);
    assert_eq!(&buf[..], b":1\r\n");
}
