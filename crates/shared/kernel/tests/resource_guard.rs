use bloom_kernel::security::resource::ResourceGuard;

#[test]
fn resource_guard_validates_and_prefixes() {
    assert_eq!(ResourceGuard::verify("appointment:123", "appointment").unwrap(), "appointment:123");

    assert_eq!(ResourceGuard::verify("123", "appointment").unwrap(), "appointment:123");

    assert!(ResourceGuard::verify("salon:123", "appointment").is_err());
}
