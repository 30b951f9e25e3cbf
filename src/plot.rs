//! Captures matplotlib figures to image files.

use crate::ast::{Attr, Block, Inline, Target};
use std::path::{Path, PathBuf};

/// Wraps Python `code` so the current figure is saved to `image` instead of
/// being shown.
pub fn wrap_source(code: &str, image: &Path) -> String {
    let target = python_string(&image.to_string_lossy());
    format!(
        "import matplotlib\n\
         matplotlib.use('Agg')\n\
         {code}\n\
         import matplotlib.pyplot as _source_exec_plt\n\
         _source_exec_plt.savefig({target}, bbox_inches='tight')\n"
    )
}

/// Path of the `number`-th plot of a document.
pub fn image_path(dir: &Path, number: usize, extension: &str) -> PathBuf {
    dir.join(format!("plot-{number}.{extension}"))
}

/// Paragraph embedding the image with the requested size.
pub fn image_block(image: &Path, width: &str, height: &str) -> Block {
    let attr = Attr::new(
        "",
        Vec::new(),
        vec![
            ("width".to_string(), width.to_string()),
            ("height".to_string(), height.to_string()),
        ],
    );
    let url = image.to_string_lossy().replace('\\', "/");
    Block::Para(vec![Inline::Image(attr, Vec::new(), Target(url, String::new()))])
}

fn python_string(value: &str) -> String {
    let mut out = String::from("'");
    for c in value.chars() {
        match c {
            '\\' | '\'' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_source() {
        let wrapped = wrap_source("plt.plot([1, 2])", Path::new("plots/plot-1.png"));
        assert_eq!(
            wrapped,
            "import matplotlib\n\
             matplotlib.use('Agg')\n\
             plt.plot([1, 2])\n\
             import matplotlib.pyplot as _source_exec_plt\n\
             _source_exec_plt.savefig('plots/plot-1.png', bbox_inches='tight')\n"
        );
    }

    #[test]
    fn test_python_string_escapes_quotes() {
        assert_eq!(python_string(r"it's\here"), r"'it\'s\\here'");
    }

    #[test]
    fn test_image_block() {
        let path = image_path(Path::new("plots"), 2, "pdf");
        assert_eq!(path, PathBuf::from("plots/plot-2.pdf"));
        let block = image_block(&path, "6cm", "4cm");
        let Block::Para(inlines) = block else {
            panic!("expected a paragraph");
        };
        let Inline::Image(attr, alt, target) = &inlines[0] else {
            panic!("expected an image");
        };
        assert_eq!(attr.get("width"), Some("6cm"));
        assert_eq!(attr.get("height"), Some("4cm"));
        assert!(alt.is_empty());
        assert_eq!(target.0, "plots/plot-2.pdf");
    }
}
