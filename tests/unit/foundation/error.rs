use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(TimewarpError::init("x").to_string().contains("init error:"));
    assert!(TimewarpError::misuse("x").to_string().contains("misuse:"));
    assert!(
        TimewarpError::validation("x")
            .to_string()
            .contains("validation error:")
    );
}

#[test]
fn status_codes_are_negative_and_distinct() {
    let codes = [
        TimewarpError::init("x").status_code(),
        TimewarpError::misuse("x").status_code(),
        TimewarpError::validation("x").status_code(),
        TimewarpError::Other(anyhow::anyhow!("x")).status_code(),
    ];
    for (i, a) in codes.iter().enumerate() {
        assert!(*a < 0);
        for b in &codes[i + 1..] {
            assert_ne!(a, b);
        }
    }
    assert_eq!(status_code(&Ok::<(), TimewarpError>(())), 0);
    assert_eq!(status_code::<()>(&Err(TimewarpError::misuse("x"))), -2);
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TimewarpError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
