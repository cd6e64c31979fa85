//! Turns a movie into a Telegram photo caption plus download buttons.
//!
//! The caption is Telegram HTML. Record text is escaped so a stray `<` in a
//! summary cannot break the markup.

use crate::relay::movie::MovieRecord;

/// Telegram rejects photo captions longer than this.
pub const MAX_CAPTION_CHARS: usize = 1024;

/// A labeled link rendered as an inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub url: String,
}

impl Button {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self { label: label.into(), url: url.into() }
    }
}

/// Everything needed to render one movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub caption: String,
    pub image_ref: String,
    pub buttons: Vec<Button>,
}

/// Escape `<`, `>` and `&` for Telegram HTML.
pub fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '&' => result.push_str("&amp;"),
            _ => result.push(c),
        }
    }
    result
}

fn caption(title: &str, summary: &str, movie: &MovieRecord) -> String {
    let mut caption = format!("<b>         {}</b>\n\n", html_escape(title));
    caption.push_str(&format!("<i><b>Summary:</b></i> {}\n\n", html_escape(summary)));
    caption.push_str(&format!("<i>Year:</i> <b>{}</b>\n", html_escape(&movie.year)));
    caption.push_str(&format!("<i>Rating:</i> <b>{}</b>\n", html_escape(&movie.rating)));
    caption.push_str(&format!("<i>Genres:</i> <b>{}</b>\n", html_escape(&movie.genres.join(", "))));
    caption
}

/// Length of the caption as Telegram counts it: tags are dropped and each
/// entity is one character.
fn visible_chars(html: &str) -> usize {
    let mut count = 0;
    let mut in_tag = false;
    let mut in_entity = false;
    for c in html.chars() {
        match c {
            '<' if !in_entity => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            '&' => {
                in_entity = true;
                count += 1;
            }
            ';' if in_entity => in_entity = false,
            _ if in_entity => {}
            _ => count += 1,
        }
    }
    count
}

/// First `max` chars of `s` followed by an ellipsis, or empty when there is
/// no room for even the ellipsis.
fn truncate_chars(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let mut out: String = s.chars().take(max - 1).collect();
    out.push('…');
    out
}

/// Raw title and summary, shortened so the caption fits. The summary goes
/// first; the title is only cut when it cannot fit on its own. Cutting
/// happens before escaping so an entity is never split.
fn fit_text(movie: &MovieRecord) -> (String, String) {
    let full = caption(&movie.title, &movie.summary, movie);
    if visible_chars(&full) <= MAX_CAPTION_CHARS {
        return (movie.title.clone(), movie.summary.clone());
    }

    let with_title = visible_chars(&caption(&movie.title, "", movie));
    if with_title <= MAX_CAPTION_CHARS {
        let budget = MAX_CAPTION_CHARS - with_title;
        return (movie.title.clone(), truncate_chars(&movie.summary, budget));
    }

    let bare = visible_chars(&caption("", "", movie));
    let budget = MAX_CAPTION_CHARS.saturating_sub(bare);
    (truncate_chars(&movie.title, budget), String::new())
}

/// Build the caption, image and button list for a movie.
pub fn format_for_display(movie: &MovieRecord) -> Display {
    let (title, summary) = fit_text(movie);
    let buttons = movie
        .download
        .iter()
        .map(|d| Button::new(d.quality.clone(), d.link.clone()))
        .collect();

    Display {
        caption: caption(&title, &summary, movie),
        image_ref: movie.image_url.clone(),
        buttons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::movie::DownloadOption;

    fn movie() -> MovieRecord {
        MovieRecord {
            title: "X".to_string(),
            summary: "A heist.".to_string(),
            rating: "8".to_string(),
            year: "2010".to_string(),
            genres: vec!["Action".to_string(), "Drama".to_string()],
            image_url: "http://img/x.jpg".to_string(),
            download: vec![
                DownloadOption { quality: "HD".to_string(), link: "http://a".to_string() },
                DownloadOption { quality: "SD".to_string(), link: "http://b".to_string() },
                DownloadOption { quality: "HD".to_string(), link: "http://c".to_string() },
            ],
            url: String::new(),
            trailer_link: String::new(),
            directors: vec![],
            actors: vec![],
        }
    }

    #[test]
    fn test_exact_caption_layout() {
        let display = format_for_display(&movie());
        assert_eq!(
            display.caption,
            "<b>         X</b>\n\n\
             <i><b>Summary:</b></i> A heist.\n\n\
             <i>Year:</i> <b>2010</b>\n\
             <i>Rating:</i> <b>8</b>\n\
             <i>Genres:</i> <b>Action, Drama</b>\n"
        );
        assert_eq!(display.image_ref, "http://img/x.jpg");
    }

    #[test]
    fn test_buttons_keep_order_and_duplicates() {
        let display = format_for_display(&movie());
        assert_eq!(
            display.buttons,
            vec![
                Button::new("HD", "http://a"),
                Button::new("SD", "http://b"),
                Button::new("HD", "http://c"),
            ]
        );
    }

    #[test]
    fn test_no_downloads_no_buttons() {
        let mut m = movie();
        m.download.clear();
        m.genres.clear();
        let display = format_for_display(&m);
        assert!(display.buttons.is_empty());
        assert!(display.caption.contains("<i>Genres:</i> <b></b>"));
    }

    #[test]
    fn test_escapes_markup_in_record_text() {
        let mut m = movie();
        m.title = "Tom & Jerry".to_string();
        m.summary = "<script>".to_string();
        let caption = format_for_display(&m).caption;
        assert!(caption.contains("Tom &amp; Jerry"));
        assert!(caption.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_visible_chars_ignores_markup() {
        assert_eq!(visible_chars("<b>ab</b>"), 2);
        assert_eq!(visible_chars("a &amp; b"), 5);
        assert_eq!(visible_chars("&lt;i&gt;"), 3);
    }

    #[test]
    fn test_summary_that_fits_visibly_is_kept() {
        let mut m = movie();
        m.summary = "a".repeat(950);
        let caption = format_for_display(&m).caption;
        assert!(!caption.contains('…'));
        assert!(caption.contains(&m.summary));
        // The raw HTML is longer than the limit; only visible text counts.
        assert!(caption.chars().count() > MAX_CAPTION_CHARS);
        assert!(visible_chars(&caption) <= MAX_CAPTION_CHARS);
    }

    #[test]
    fn test_ampersand_summary_is_not_cut_for_entity_width() {
        let mut m = movie();
        m.summary = "&".repeat(400);
        let caption = format_for_display(&m).caption;
        assert!(!caption.contains('…'));
        assert_eq!(caption.matches("&amp;").count(), 400);
    }

    #[test]
    fn test_long_summary_is_truncated_to_caption_limit() {
        let mut m = movie();
        m.summary = "é&".repeat(2000);
        let caption = format_for_display(&m).caption;
        assert_eq!(visible_chars(&caption), MAX_CAPTION_CHARS);
        assert!(caption.contains('…'));
        assert!(!caption.contains("&am…"));
        assert!(caption.ends_with("<i>Genres:</i> <b>Action, Drama</b>\n"));
    }

    #[test]
    fn test_oversized_title_is_cut_and_summary_dropped() {
        let mut m = movie();
        m.title = "T".repeat(1100);
        let caption = format_for_display(&m).caption;
        assert!(visible_chars(&caption) <= MAX_CAPTION_CHARS);
        assert!(caption.contains("T…</b>"));
        assert!(caption.contains("<i><b>Summary:</b></i> \n\n"));
        assert!(caption.ends_with("<i>Genres:</i> <b>Action, Drama</b>\n"));
    }

    #[test]
    fn test_deterministic() {
        let m = movie();
        assert_eq!(format_for_display(&m), format_for_display(&m));
    }
}
