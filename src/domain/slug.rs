//! Slug derivation for category titles.
//!
//! Titles are transliterated (CJK via `pinyin`) before ASCII slugification so
//! "技术 Notes" becomes `ji-shu-notes`. Uniqueness is delegated to a caller
//! supplied predicate, which keeps the derivation itself free of storage.

use std::future::Future;

use pinyin::ToPinyin;
use slug::slugify;
use thiserror::Error;

const MAX_SUFFIX_ATTEMPTS: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
    #[error("exhausted attempts to find a unique slug for `{base}`")]
    Exhausted { base: String },
}

#[derive(Debug, Error)]
pub enum SlugAsyncError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error(transparent)]
    Slug(#[from] SlugError),
    #[error(transparent)]
    Predicate(E),
}

/// Derive the base slug for a title.
pub fn derive_slug(title: &str) -> Result<String, SlugError> {
    if title.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(transliterate(title));
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: title.to_string(),
        });
    }

    Ok(candidate)
}

/// Derive a slug for `title` that `is_unique` accepts, suffixing `-2`, `-3`, …
/// on collision.
pub async fn generate_unique_slug_async<F, Fut, E>(
    title: &str,
    mut is_unique: F,
) -> Result<String, SlugAsyncError<E>>
where
    F: FnMut(&str) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    let base = derive_slug(title)?;

    let suffixed = (2..=MAX_SUFFIX_ATTEMPTS + 1).map(|n| format!("{base}-{n}"));
    let candidates = std::iter::once(base.clone()).chain(suffixed);

    for candidate in candidates {
        if is_unique(&candidate)
            .await
            .map_err(SlugAsyncError::Predicate)?
        {
            return Ok(candidate);
        }
    }

    Err(SlugAsyncError::Slug(SlugError::Exhausted { base }))
}

fn transliterate(input: &str) -> String {
    let mut output = String::with_capacity(input.len());

    for ch in input.chars() {
        if ch.is_ascii() {
            output.push(ch);
            continue;
        }

        match ch.to_pinyin() {
            Some(py) => {
                if !output.is_empty() && !output.ends_with(' ') {
                    output.push(' ');
                }
                output.push_str(py.plain());
                output.push(' ');
            }
            None if ch.is_whitespace() => output.push(' '),
            // slugify decides what survives
            None => output.push(ch),
        }
    }

    output
}
