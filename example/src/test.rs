#[cfg(test)]
mod tests {
    use crate::{TEMPLATE, processor};

    fn render(name: &str, kind: &str) -> String {
        processor(name, kind).unwrap().process_str(TEMPLATE).unwrap().0
    }

    #[test]
    fn binary_manifest() {
        let manifest = render("Greeter", "bin");
        assert!(manifest.starts_with("[package]\nname = \"greeter\"\nversion = \"0.1.0\"\nedition = \"2024\"\n\n[[bin]]\n"));
        assert!(!manifest.contains("#-docs"));
        assert!(!manifest.contains("[lib]"));
    }

    #[test]
    fn proc_macro_manifest() {
        let manifest = render("Greeter-Derive", "proc-macro");
        assert!(manifest.contains("[lib]\nproc-macro = true\n\n# build "));
        assert!(!manifest.contains("src/lib.rs"));
    }

    #[test]
    fn library_manifest() {
        let manifest = render("Greeter-Core", "lib");
        assert!(manifest.contains("name = \"greeter-core\""));
        assert!(manifest.contains("[lib]\npath = \"src/lib.rs\"\n"));
    }
}
