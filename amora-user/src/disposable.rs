use std::collections::HashSet;

use once_cell::sync::Lazy;

/// Throwaway-mailbox providers refused at sign-up unless
/// `ALLOWED_DISPOSABLE_EMAIL` is set.
static DISPOSABLE_DOMAINS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "0-mail.com",
        "10minutemail.com",
        "20minutemail.com",
        "33mail.com",
        "burnermail.io",
        "discard.email",
        "dispostable.com",
        "dropmail.me",
        "emailondeck.com",
        "fakeinbox.com",
        "getairmail.com",
        "getnada.com",
        "guerrillamail.com",
        "guerrillamail.net",
        "guerrillamailblock.com",
        "harakirimail.com",
        "inboxkitten.com",
        "jetable.org",
        "mailcatch.com",
        "maildrop.cc",
        "mailinator.com",
        "mailnesia.com",
        "mintemail.com",
        "mohmal.com",
        "moakt.com",
        "mytemp.email",
        "sharklasers.com",
        "spamgourmet.com",
        "temp-mail.org",
        "tempail.com",
        "tempmail.dev",
        "tempmailo.com",
        "tempr.email",
        "throwawaymail.com",
        "trashmail.com",
        "trashmail.de",
        "yopmail.com",
        "yopmail.net",
    ]
    .into_iter()
    .collect()
});

pub fn is_disposable(email: &str) -> bool {
    email
        .rsplit_once('@')
        .map(|(_, domain)| DISPOSABLE_DOMAINS.contains(domain.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_domain_case_insensitively() {
        assert!(is_disposable("someone@mailinator.com"));
        assert!(is_disposable("someone@YopMail.com"));
        assert!(!is_disposable("someone@gmail.com"));
        assert!(!is_disposable("not-an-email"));
    }

    #[test]
    fn subdomains_are_not_matched() {
        assert!(!is_disposable("a@eu.mailinator.company"));
    }
}
