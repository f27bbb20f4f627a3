use crate::workflows::registration::codes::{
    decode, session_equivalent_raw, ClassCode, UnknownCode,
};

#[test]
fn decodes_known_code() {
    let schedule = decode("21123").expect("decodes");
    assert_eq!(schedule.course, "Python");
    assert_eq!(schedule.level, "Beginner");
    assert_eq!(schedule.days, "Mon & Wed");
    assert_eq!(schedule.time, "2-3 PM Pacific Time");
    assert_eq!(schedule.session, 3);
}

#[test]
fn rejects_wrong_length_and_non_digits() {
    assert!(matches!(decode("2112"), Err(UnknownCode::Malformed(_))));
    assert!(matches!(decode("211234"), Err(UnknownCode::Malformed(_))));
    assert!(matches!(decode("21a23"), Err(UnknownCode::Malformed(_))));
    assert!(matches!(decode(""), Err(UnknownCode::Malformed(_))));
}

#[test]
fn rejects_digits_outside_vocabulary() {
    let err = decode("91123").expect_err("course 9 unknown");
    assert!(matches!(
        err,
        UnknownCode::Vocabulary {
            field: "course",
            digit: '9',
            ..
        }
    ));

    let err = decode("21023").expect_err("days 0 unknown");
    assert!(matches!(err, UnknownCode::Vocabulary { field: "days", .. }));
}

#[test]
fn parse_trims_surrounding_whitespace() {
    let code = ClassCode::parse(" 21123 ").expect("parses");
    assert_eq!(code.as_str(), "21123");
}

#[test]
fn session_equivalence_ignores_only_the_session_digit() {
    let first = ClassCode::parse("21123").expect("parses");
    let second = ClassCode::parse("21124").expect("parses");
    let other = ClassCode::parse("21223").expect("parses");

    assert!(first.session_equivalent(&second));
    assert!(!first.session_equivalent(&other));
}

#[test]
fn malformed_codes_are_never_session_equivalent() {
    assert!(session_equivalent_raw("21123", "21124"));
    assert!(!session_equivalent_raw("2112", "21123"));
    assert!(!session_equivalent_raw("21123", "211234"));
    assert!(!session_equivalent_raw("", ""));
}
