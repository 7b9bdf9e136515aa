use crate::application::repos::RepoError;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Duplicate {
            constraint: db.constraint().unwrap_or("unknown").to_string(),
        },
        sqlx::Error::Database(db)
            if db.is_foreign_key_violation() || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}
