use crate::config::Config;
use unicode_normalization::UnicodeNormalization;

/// Cleans raw extracted page text before it is searched or dumped.
pub fn clean_text(cfg: &Config, raw: &str) -> String {
    let mut text = raw.to_string();

    if cfg.postprocess.normalize_newlines {
        text = text.replace("\r\n", "\n").replace('\r', "\n");
    }

    if cfg.postprocess.normalize_unicode {
        text = text.nfkc().collect::<String>();
    }

    if cfg.postprocess.strip_control_chars {
        text = strip_control_chars(&text);
    }

    if cfg.postprocess.trim_trailing_whitespace {
        let had_final_newline = text.ends_with('\n');
        text = text
            .lines()
            .map(|l| l.trim_end())
            .collect::<Vec<_>>()
            .join("\n");
        if had_final_newline {
            text.push('\n');
        }
    }

    text
}

fn strip_control_chars(s: &str) -> String {
    s.chars()
        .filter(|&ch| {
            // Structural whitespace survives.
            if ch == '\n' || ch == '\r' || ch == '\t' {
                return true;
            }
            !ch.is_control()
        })
        .collect()
}
