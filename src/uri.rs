/// Will generate a standard URL used to automatically add TOTP auths. Usually used with qr codes
///
/// Label and issuer are percent-encoded, so a `:`, `/` or space inside them cannot break the
/// `issuer:account` label. Secret will be written without `=` padding, as per the key uri format.
/// Algorithm, digits and period are the defaults every app assumes and are left out.
///
/// ```rust
/// use dotp::provisioning_uri;
///
/// let uri = provisioning_uri("GEZDGNBVGY3TQOJQ", "foo@bar", "myapp");
/// assert_eq!(uri, "otpauth://totp/myapp:foo%40bar?secret=GEZDGNBVGY3TQOJQ&issuer=myapp");
/// ```
pub fn provisioning_uri(secret: &str, account_name: &str, issuer: &str) -> String {
    let issuer = urlencoding::encode(issuer);
    let account_name = urlencoding::encode(account_name);
    let secret = urlencoding::encode(secret.trim_end_matches('='));

    format!(
        "otpauth://totp/{0}:{1}?secret={2}&issuer={0}",
        issuer, account_name, secret
    )
}
