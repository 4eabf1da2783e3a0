use std::fs;
use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn readme() -> String {
    fs::read_to_string(workspace_root().join("README.md")).expect("README.md should exist")
}

/// Lines of the Markdown section that starts with `heading`, up to the next heading.
fn section<'a>(text: &'a str, heading: &str) -> Vec<&'a str> {
    text.lines()
        .skip_while(|line| line.trim() != heading)
        .skip(1)
        .take_while(|line| !line.starts_with("## "))
        .filter(|line| !line.trim().is_empty())
        .collect()
}

#[test]
fn every_listed_directory_exists() {
    let text = readme();
    let listed: Vec<&str> = section(&text, "## Manifest")
        .into_iter()
        .filter_map(|line| line.strip_prefix("* `"))
        .filter_map(|rest| rest.split('`').next())
        .collect();

    assert!(!listed.is_empty(), "README lists no directories");
    for dir in listed {
        let path = workspace_root().join(dir);
        assert!(
            path.is_dir(),
            "README lists '{}', which does not exist",
            dir
        );
    }
}

#[test]
fn badge_links_to_https_ci() {
    let text = readme();
    let badge = text
        .lines()
        .find(|line| line.starts_with("[!["))
        .expect("README has no badge");
    let target = badge
        .rsplit("](")
        .next()
        .and_then(|rest| rest.strip_suffix(')'))
        .expect("badge has no link target");
    assert!(
        target.starts_with("https://"),
        "badge link '{}' is not https",
        target
    );
}

#[test]
fn authors_list_is_not_empty() {
    let text = readme();
    let authors: Vec<&str> = section(&text, "## Authors")
        .into_iter()
        .filter_map(|line| line.strip_prefix("* "))
        .filter(|name| !name.trim().is_empty())
        .collect();
    assert!(!authors.is_empty());
}

#[test]
fn project_header_names_the_package() {
    let text = readme();
    assert_eq!(text.lines().next(), Some("perses"));
    assert!(text.contains("expanded ensemble simulation to explore chemical and mutational space"));
}
