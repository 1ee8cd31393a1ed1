/// `"<title> - <image id>"`, with path separators in the title replaced so the
/// file always lands directly inside the output directory.
pub fn image_file_name(title: &str, image_id: &str) -> String {
    let title = title.replace(['/', '\\'], "-");
    format!("{title} - {image_id}")
}
