/// Canonicalizes phone input to the 10-digit form used as the client key.
///
/// Never fails: the result may be shorter than 10 digits, and callers must
/// check `is_canonical` before treating it as an identity.
pub fn normalize_phone(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        10 => digits,
        11 if digits.starts_with('1') => digits[1..].to_string(),
        n if n > 10 => digits[n - 10..].to_string(),
        _ => digits,
    }
}

pub fn is_canonical(phone: &str) -> bool {
    phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit())
}

/// `+1XXXXXXXXXX` for a canonical number; other digit strings just get `+`.
pub fn to_e164(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("+1{digits}")
    } else {
        format!("+{digits}")
    }
}

/// `954-804-4747` style, for message bodies.
pub fn display(phone: &str) -> String {
    if is_canonical(phone) {
        format!("{}-{}-{}", &phone[..3], &phone[3..6], &phone[6..])
    } else {
        phone.to_string()
    }
}
