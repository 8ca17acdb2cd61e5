//! Portuguese (pt-BR) name collation backed by ICU root/pt collation data,
//! at tertiary strength: base letters first, then accents, then case with
//! lowercase first.

use std::cmp::Ordering;

use icu_collator::{Collator, CollatorOptions, Strength};
use icu_locid::locale;

thread_local! {
    static PT_BR: Option<Collator> = pt_br_collator();
}

fn pt_br_collator() -> Option<Collator> {
    let mut options = CollatorOptions::new();
    options.strength = Some(Strength::Tertiary);
    match Collator::try_new(&locale!("pt-BR").into(), options) {
        Ok(collator) => Some(collator),
        Err(e) => {
            tracing::warn!(error = ?e, "pt-BR collation data unavailable; comparing names by code point");
            None
        }
    }
}

/// Compare two display names the way a pt-BR locale sorts them. Names that
/// collate equal fall back to code point order so the result is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    PT_BR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        })
        .then_with(|| a.cmp(b))
}
