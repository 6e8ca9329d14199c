//! Process-wide text interner. Feedback messages and screen texts are interned
//! once so stimuli can carry a small integer id instead of the string.

use lazy_static::lazy_static;
use std::sync::RwLock;
use string_cache::DefaultAtom as Atom;

lazy_static! {
    static ref TEXT_INTERNER: RwLock<Vec<Atom>> = RwLock::new(Vec::new());
}

/// Intern a string and return its ID
pub fn intern_text(s: &str) -> usize {
    let atom = Atom::from(s);
    if let Some(idx) = position(&atom) {
        return idx;
    }
    let mut v = TEXT_INTERNER.write().unwrap_or_else(|e| e.into_inner());
    // Another writer may have pushed the same atom between the two locks.
    match v.iter().position(|a| *a == atom) {
        Some(idx) => idx,
        None => {
            v.push(atom);
            v.len() - 1
        }
    }
}

fn position(atom: &Atom) -> Option<usize> {
    TEXT_INTERNER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .position(|a| a == atom)
}

pub fn get_text(id: usize) -> Option<String> {
    TEXT_INTERNER
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(id)
        .map(|a| a.to_string())
}
