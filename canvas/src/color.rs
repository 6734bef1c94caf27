//! Deterministic cursor colors.
//!
//! No service hands out colors: every client derives a peer's color from the
//! peer's user id on its own, so the mapping must be identical everywhere and
//! must never change between releases.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

/// Cursor palette, in assignment order.
pub const CURSOR_COLORS: [&str; 8] = [
    "#F59E0B", // amber
    "#EC4899", // pink
    "#8B5CF6", // purple
    "#10B981", // emerald
    "#3B82F6", // blue
    "#EF4444", // red
    "#14B8A6", // teal
    "#F97316", // orange
];

/// Fold a user id into the palette hash.
///
/// Each UTF-16 code unit `c` updates `hash = c + ((hash << 5) - hash)`. The
/// shift operates on the 32-bit truncation of the running value while the
/// subtraction and addition do not, so the final value can leave the `i32`
/// range; it is carried in an `i64`.
#[must_use]
pub fn user_hash(user_id: &str) -> i64 {
    let mut hash: i64 = 0;
    for unit in user_id.encode_utf16() {
        #[allow(clippy::cast_possible_truncation)]
        let shifted = i64::from((hash as i32).wrapping_shl(5));
        hash = i64::from(unit) + (shifted - hash);
    }
    hash
}

/// Display color for a user's cursor and avatar.
#[must_use]
pub fn cursor_color(user_id: &str) -> &'static str {
    #[allow(clippy::cast_possible_truncation)]
    let index = (user_hash(user_id).unsigned_abs() % CURSOR_COLORS.len() as u64) as usize;
    CURSOR_COLORS[index]
}
