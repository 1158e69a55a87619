//! Inline option handling
//!
//! Only two options change how a pattern is tokenized: `x` (free-spacing)
//! and `n` (explicit capture). The others (`i`, `m`, `s`) are carried
//! through as text.

/// Characters that may follow `(?` in an inline-option construct
pub const OPTION_CHARS: &str = "+-imnsxIMNSX";

/// The modifier letters, one per distinct option
pub const OPTION_LETTERS: [char; 5] = ['i', 'm', 'n', 's', 'x'];

/// Whether `c` may appear in an inline-option construct such as `(?i-x)`
pub fn is_option_char(c: char) -> bool {
    OPTION_CHARS.contains(c)
}

/// Whether `c` is one of the five modifier letters (either case)
pub fn is_option_letter(c: char) -> bool {
    OPTION_LETTERS.contains(&c.to_ascii_lowercase())
}

/// Mode flags that affect tokenization
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModeFlags {
    /// Free-spacing mode: whitespace and `#` comments are insignificant (`x`)
    pub extended: bool,
    /// Plain parentheses do not capture (`n`)
    pub explicit_capture: bool,
}

impl ModeFlags {
    /// Apply an option run like `"i-x"` or `"+n-s"` on top of the current flags
    pub fn apply(&mut self, options: &str) {
        let mut on = true;
        for c in options.chars() {
            match c {
                '+' => on = true,
                '-' => on = false,
                'x' | 'X' => self.extended = on,
                'n' | 'N' => self.explicit_capture = on,
                _ => {}
            }
        }
    }

    /// Parse mode flags from a string like "nx"
    pub fn from_string(options: &str) -> Self {
        let mut mode = ModeFlags::default();
        mode.apply(options);
        mode
    }
}
