use super::theme::OneDark;
use journalpix_core::EmittedEntry;
use termimad::MadSkin;

#[derive(Clone)]
pub struct RenderOptions {
    pub date_format: String,
    pub use_color: bool,
}

pub struct Renderer {
    skin: MadSkin,
    opts: RenderOptions,
}

impl Renderer {
    pub fn new(config: Option<RenderOptions>) -> Self {
        Self {
            skin: OneDark::default_onedark_skin(),
            opts: match config {
                Some(config) => config,
                None => RenderOptions {
                    date_format: "%a, %d %b %Y %H:%M".to_string(),
                    use_color: true,
                },
            },
        }
    }

    pub fn print_md(&self, md: &str) {
        if self.opts.use_color {
            self.skin.print_text(md);
        } else {
            print!("{md}");
        }
    }

    pub fn print_line(&self, line: &str) {
        println!("{line}");
    }

    pub fn print_info(&self, message: &str) {
        if self.opts.use_color {
            let md = format!("|-|\n| {message} |\n|-|\n");
            self.skin.print_text(&md);
        } else {
            println!("{message}");
        }
    }

    pub fn print_entries(&self, entries: &[EmittedEntry]) {
        for (i, entry) in entries.iter().enumerate() {
            self.print_md(&self.entry_markdown(entry));
            if i + 1 < entries.len() {
                self.print_md("---\n");
            }
        }
    }

    /// ```text
    /// ## My Trip
    /// *Alice, Sun, 05 Jan 2020 09:15*
    /// > Had fun
    /// * `output/My Trip - Im1.jpg`
    /// ```
    fn entry_markdown(&self, entry: &EmittedEntry) -> String {
        let taken = entry.captured_at.format(&self.opts.date_format);
        let mut md = format!("## {}\n*{}, {}*\n", entry.title.trim(), entry.author, taken);
        if !entry.note.trim().is_empty() {
            md.push_str(&format!("> {}\n", entry.note.trim()));
        }
        for file in &entry.files {
            md.push_str(&format!("* `{}`\n", file.display()));
        }
        md
    }
}
