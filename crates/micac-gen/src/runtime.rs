//! Runtime assembly merging.
//!
//! The runtime source carries its own `section .data` / `section .bss` /
//! `section .text` directives. Its lines are routed into the matching
//! output sections so the final file declares each section once.

/// Split `runtime` at its section directives and append each piece to
/// the corresponding output section.
pub fn merge_runtime(runtime: &str, data: &mut String, bss: &mut String, text: &mut String) {
    #[derive(PartialEq)]
    enum Section {
        Data,
        Bss,
        Text,
    }

    let mut current = Section::Text;
    for raw_line in runtime.lines() {
        let line = raw_line.trim();
        if line.starts_with("section .data") {
            current = Section::Data;
            continue;
        }
        if line.starts_with("section .bss") {
            current = Section::Bss;
            continue;
        }
        if line.starts_with("section .text") {
            current = Section::Text;
            continue;
        }
        let target = match current {
            Section::Data => &mut *data,
            Section::Bss => &mut *bss,
            Section::Text => &mut *text,
        };
        target.push_str(line);
        target.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_routed_by_section() {
        let runtime = "section .data\nnewline db 0xA\nsection .bss\nbuffer resb 12\nsection .text\nprint_integer:\nret\n";
        let mut data = String::from("section .data\n");
        let mut bss = String::from("section .bss\n");
        let mut text = String::from("section .text\n");
        merge_runtime(runtime, &mut data, &mut bss, &mut text);
        assert_eq!(data, "section .data\nnewline db 0xA\n");
        assert_eq!(bss, "section .bss\nbuffer resb 12\n");
        assert_eq!(text, "section .text\nprint_integer:\nret\n");
    }

    #[test]
    fn test_leading_lines_default_to_text() {
        let runtime = "print_boolean:\nret\n";
        let mut data = String::new();
        let mut bss = String::new();
        let mut text = String::new();
        merge_runtime(runtime, &mut data, &mut bss, &mut text);
        assert!(data.is_empty());
        assert_eq!(text, "print_boolean:\nret\n");
    }

    #[test]
    fn test_indented_directives_recognized() {
        let runtime = "  section .data\n  newline db 0xA\n";
        let mut data = String::new();
        let mut bss = String::new();
        let mut text = String::new();
        merge_runtime(runtime, &mut data, &mut bss, &mut text);
        assert_eq!(data, "newline db 0xA\n");
        assert!(text.is_empty());
    }
}
