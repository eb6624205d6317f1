//! Username and password rules shared by registration and login.

/// Longest username accepted at registration.
pub const MAX_USERNAME_LEN: usize = 150;

/// Shortest password accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Usernames may contain letters, digits and `@ . + - _`.
pub fn is_valid_username(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate.chars().count() <= MAX_USERNAME_LEN
        && candidate
            .chars()
            .all(|ch| ch.is_alphanumeric() || matches!(ch, '@' | '.' | '+' | '-' | '_'))
}

/// Password problems, in the order they are reported to the user.
pub fn password_problems(password: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LEN {
        problems.push("This password is too short. It must contain at least 8 characters.");
    }
    if !password.is_empty() && password.chars().all(|ch| ch.is_ascii_digit()) {
        problems.push("This password is entirely numeric.");
    }
    problems
}
