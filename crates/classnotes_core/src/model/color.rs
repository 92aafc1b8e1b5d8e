//! Deterministic colour assignment for modules and session types.
//!
//! Module colours hash the module code with 32-bit FNV-1a so the same code
//! maps to the same palette entry on every run and platform.

/// Palette used for module folders.
pub const MODULE_PALETTE: [&str; 8] = [
    "#007AFF", "#FF3B30", "#FF9500", "#FFCC00", "#34C759", "#5856D6", "#AF52DE", "#FF2D92",
];

/// Colour used when a folder carries no explicit colour.
pub const DEFAULT_FOLDER_COLOR: &str = "#007AFF";

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Returns the palette colour for a module code.
pub fn color_for(key: &str) -> &'static str {
    let index = fnv1a_32(key.as_bytes()) as usize % MODULE_PALETTE.len();
    MODULE_PALETTE[index]
}

/// Returns the fixed colour for a session-type sub-folder.
pub fn color_for_session_type(session_type: &str) -> &'static str {
    match session_type.to_ascii_lowercase().as_str() {
        "lecture" => "#007AFF",
        "tutorial" => "#34C759",
        "lab" | "laboratory" => "#FF9500",
        "general" => "#6366F1",
        _ => "#AF52DE",
    }
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::{color_for, color_for_session_type, fnv1a_32, MODULE_PALETTE};

    #[test]
    fn fnv1a_matches_reference_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c_9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c_292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9c_f968);
    }

    #[test]
    fn module_color_is_stable_and_from_palette() {
        let first = color_for("CS2030");
        assert_eq!(first, color_for("CS2030"));
        assert!(MODULE_PALETTE.contains(&first));
    }

    #[test]
    fn session_type_colors_use_fixed_table() {
        assert_eq!(color_for_session_type("lecture"), "#007AFF");
        assert_eq!(color_for_session_type("Tutorial"), "#34C759");
        assert_eq!(color_for_session_type("lab"), "#FF9500");
        assert_eq!(color_for_session_type("laboratory"), "#FF9500");
        assert_eq!(color_for_session_type("general"), "#6366F1");
        assert_eq!(color_for_session_type("others"), "#AF52DE");
    }
}
