use super::*;

// Expected values come from running the browser implementation of the hash.

#[test]
fn hash_of_empty_id_is_zero() {
    assert_eq!(user_hash(""), 0);
    assert_eq!(cursor_color(""), "#F59E0B");
}

#[test]
fn hash_matches_browser_for_short_ids() {
    assert_eq!(user_hash("a"), 97);
    assert_eq!(user_hash("ab"), 3105);
    assert_eq!(user_hash("bob"), 97_717);
    assert_eq!(user_hash("alice"), 92_903_040);
    assert_eq!(user_hash("user-1"), -836_031_825);
}

#[test]
fn hash_leaves_i32_range_like_browser() {
    assert_eq!(user_hash("3f2c9a10-7b1e-4c1d-9a55-0e6f2b7d8c41"), -4_960_543_600);
    assert_eq!(user_hash("a much longer identifier that overflows 32 bits"), 5_713_366_995);
}

#[test]
fn hash_uses_utf16_code_units() {
    assert_eq!(user_hash("ünïcødé"), -609_219_977);
}

#[test]
fn colors_match_browser() {
    let cases = [
        ("a", "#EC4899"),
        ("alice", "#F59E0B"),
        ("bob", "#EF4444"),
        ("user-1", "#EC4899"),
        ("3f2c9a10-7b1e-4c1d-9a55-0e6f2b7d8c41", "#F59E0B"),
        ("a much longer identifier that overflows 32 bits", "#10B981"),
        ("ünïcødé", "#EC4899"),
    ];
    for (id, expected) in cases {
        assert_eq!(cursor_color(id), expected, "color for {id:?}");
    }
}

#[test]
fn color_is_pure() {
    let id = "0b7d2c1e-55aa-4f00-8c9d-123456789abc";
    let first = cursor_color(id);
    for _ in 0..100 {
        assert_eq!(cursor_color(id), first);
    }
}

#[test]
fn color_is_always_from_palette() {
    for n in 0..500 {
        let id = format!("user-{n}");
        assert!(CURSOR_COLORS.contains(&cursor_color(&id)));
    }
}
