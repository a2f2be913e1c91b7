//! Tests for the `JSON.stringify`-compatible canonical form.

use super::*;

fn canonical(body: &str) -> String {
    let value: Value = serde_json::from_str(body).unwrap();
    to_canonical_json(&value)
}

mod numbers {
    use super::*;

    #[test]
    fn test_integral_floats_print_as_integers() {
        assert_eq!(
            canonical(r#"{"amount_usd":10.0,"delta":-0.0}"#),
            r#"{"amount_usd":10,"delta":0}"#
        );
    }

    #[test]
    fn test_exponents_follow_number_to_string() {
        assert_eq!(
            canonical(r#"{"n":1e21,"m":1.5e-7,"p":0.000001,"e":2.5E+3,"neg":-120.50}"#),
            r#"{"n":1e+21,"m":1.5e-7,"p":0.000001,"e":2500,"neg":-120.5}"#
        );
    }

    #[test]
    fn test_large_integers_lose_precision_like_doubles() {
        assert_eq!(
            canonical(r#"{"big":12345678901234567890}"#),
            r#"{"big":12345678901234567000}"#
        );
    }

    #[test]
    fn test_shortest_round_trip_digits() {
        assert_eq!(format_js_number(0.1), "0.1");
        assert_eq!(format_js_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_js_number(123456789012345680000.0), "123456789012345680000");
        assert_eq!(format_js_number(-5e-324), "-5e-324");
        assert_eq!(format_js_number(1.7976931348623157e308), "1.7976931348623157e+308");
    }
}

mod keys {
    use super::*;

    #[test]
    fn test_array_index_keys_come_first_in_numeric_order() {
        assert_eq!(
            canonical(r#"{"b":1,"10":"x","2":"y","a":2}"#),
            r#"{"2":"y","10":"x","b":1,"a":2}"#
        );
    }

    #[test]
    fn test_non_index_numeric_keys_keep_arrival_order() {
        assert_eq!(
            canonical(r#"{"data":[1.0,{"01":1,"1":2,"4294967295":3,"4294967294":4}]}"#),
            r#"{"data":[1,{"1":2,"4294967294":4,"01":1,"4294967295":3}]}"#
        );
    }

    #[test]
    fn test_plain_keys_keep_arrival_order() {
        assert_eq!(canonical(r#"{ "z" : 1, "a" : 2 }"#), r#"{"z":1,"a":2}"#);
    }
}

mod strings {
    use super::*;

    #[test]
    fn test_only_quotes_backslashes_and_controls_are_escaped() {
        assert_eq!(
            canonical(r#"{"s":"line\nbreak \u0001 \"q\" \u00e9 \u2028 \/ tab\t"}"#),
            "{\"s\":\"line\\nbreak \\u0001 \\\"q\\\" \u{e9} \u{2028} / tab\\t\"}"
        );
    }
}
