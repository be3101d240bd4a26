#![warn(clippy::all)]

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use htmlguard::{DisallowedTagsMode, Merge, SanitizationOptions, SanitizerBuilder};
use log::LevelFilter;

/// Sanitize an HTML fragment against an allow-list policy
#[derive(Parser, Debug)]
#[command(name = "htmlguard")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Sanitize with the default policy
    htmlguard < untrusted.html

    # Keep images and their alt text
    htmlguard --allow-tag img --allow-attr img:src --allow-attr img:alt -i page.html

    # Show rejected tags as text
    htmlguard --escape < untrusted.html

    # Start from a JSON policy and also allow https links only
    htmlguard --policy policy.json --allow-attr a:href < untrusted.html
"#)]
struct Cli {
    /// JSON sanitization policy to start from instead of the defaults
    #[arg(long, value_name = "FILE")]
    policy: Option<PathBuf>,

    /// Read HTML from a file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Render disallowed tags as escaped text instead of dropping them. A policy file sets
    /// this through its disallowed_tags_mode field instead
    #[arg(long, conflicts_with = "policy")]
    escape: bool,

    /// Allow an additional tag
    #[arg(long = "allow-tag", value_name = "TAG")]
    allow_tags: Vec<String>,

    /// Allow an attribute on a tag; use * as the tag for every tag
    #[arg(long = "allow-attr", value_name = "TAG:ATTR", value_parser = parse_tag_attribute)]
    allow_attributes: Vec<(String, String)>,

    /// Allow every tag
    #[arg(long)]
    allow_all_tags: bool,

    /// Allow an additional URL scheme
    #[arg(long = "allow-scheme", value_name = "SCHEME")]
    allow_schemes: Vec<String>,
}

fn parse_tag_attribute(value: &str) -> Result<(String, String), String> {
    match value.split_once(':') {
        Some((tag, attribute)) if !tag.is_empty() && !attribute.is_empty() => {
            Ok((tag.to_owned(), attribute.to_owned()))
        }
        _ => Err(format!("expected TAG:ATTR, got {:?}", value)),
    }
}

fn builder_from_cli(cli: &Cli) -> anyhow::Result<SanitizerBuilder> {
    let mode = if cli.escape {
        DisallowedTagsMode::Escape
    } else {
        DisallowedTagsMode::Discard
    };

    let mut builder = match &cli.policy {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open policy {}", path.display()))?;
            let options = SanitizationOptions::from_json_reader(BufReader::new(file))
                .with_context(|| format!("failed to load policy {}", path.display()))?;
            SanitizerBuilder::from_options(options)
        }
        None => SanitizerBuilder::with_mode(mode),
    };

    if cli.allow_all_tags {
        builder = builder.allow_all_tags();
    }
    if !cli.allow_tags.is_empty() {
        builder = builder.allow_tags(cli.allow_tags.iter().cloned(), Merge::Append);
    }
    for (tag, attribute) in &cli.allow_attributes {
        builder = builder.allow_attributes(vec![attribute.as_str()], tag.as_str(), Merge::Append);
    }
    if !cli.allow_schemes.is_empty() {
        builder = builder.allow_url_schemes(cli.allow_schemes.iter().cloned(), Merge::Append);
    }
    Ok(builder)
}

fn main() -> anyhow::Result<()> {
    let mut logger = env_logger::Builder::from_default_env();
    if std::env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Info);
    }
    logger.init();

    let cli = Cli::parse();
    let sanitizer = builder_from_cli(&cli)?.build();

    let stdout = io::stdout();
    let mut output = BufWriter::new(stdout.lock());
    match &cli.input {
        Some(path) => {
            let mut input = File::open(path)
                .with_context(|| format!("failed to open input {}", path.display()))?;
            sanitizer.sanitize_fragment(&mut input, &mut output)?;
        }
        None => sanitizer.sanitize_fragment(&mut io::stdin(), &mut output)?,
    }
    output.flush()?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    use std::io::Write;

    use htmlguard::{AllowList, AttributeRule, TagKey};
    use tempfile::NamedTempFile;

    fn builder(args: &[&str]) -> SanitizerBuilder {
        let cli = Cli::try_parse_from(std::iter::once("htmlguard").chain(args.iter().copied()))
            .unwrap();
        builder_from_cli(&cli).unwrap()
    }

    #[test]
    fn parses_tag_attribute_pairs() {
        assert_eq!(
            parse_tag_attribute("img:src"),
            Ok((String::from("img"), String::from("src")))
        );
        assert_eq!(
            parse_tag_attribute("*:title"),
            Ok((String::from("*"), String::from("title")))
        );
        assert!(parse_tag_attribute("img:").is_err());
        assert!(parse_tag_attribute(":src").is_err());
        assert!(parse_tag_attribute("img").is_err());
    }

    #[test]
    fn defaults_without_flags() {
        let builder = builder(&[]);
        assert_eq!(builder.options(), &SanitizationOptions::default());
    }

    #[test]
    fn repeated_allow_flags_accumulate() {
        let builder = builder(&[
            "--allow-tag",
            "img",
            "--allow-tag",
            "video",
            "--allow-attr",
            "*:title",
            "--allow-attr",
            "video:src",
            "--allow-scheme",
            "data",
            "--allow-scheme",
            "sms",
        ]);
        let options = builder.options();
        assert!(options.allows_tag("img"));
        assert!(options.allows_tag("video"));
        assert!(options.allows_tag("p"));

        let attributes = options.allowed_attributes.restricted().unwrap();
        assert_eq!(attributes[&TagKey::Wildcard], vec![AttributeRule::from("title")]);
        assert_eq!(attributes[&TagKey::from("video")], vec![AttributeRule::from("src")]);
        assert!(attributes.contains_key(&TagKey::from("a")));
        assert!(options.allowed_schemes.ends_with(&[String::from("data"), String::from("sms")]));
    }

    #[test]
    fn escape_and_allow_all_tags() {
        let builder = builder(&["--escape", "--allow-all-tags"]);
        assert_eq!(builder.options().disallowed_tags_mode(), DisallowedTagsMode::Escape);
        assert_eq!(builder.options().allowed_tags, AllowList::Unrestricted);
    }

    #[test]
    fn policy_file_is_the_starting_point() {
        let mut policy = NamedTempFile::new().unwrap();
        write!(
            policy,
            r#"{{"allowed_tags": {{"restricted": ["p"]}}, "disallowed_tags_mode": "escape"}}"#
        )
        .unwrap();
        let path = policy.path().to_str().unwrap();

        let builder = builder(&["--policy", path, "--allow-tag", "b"]);
        let options = builder.options();
        assert_eq!(options.disallowed_tags_mode(), DisallowedTagsMode::Escape);
        assert_eq!(
            options.allowed_tags,
            AllowList::Restricted(vec![String::from("p"), String::from("b")])
        );
    }

    #[test]
    fn policy_conflicts_with_escape() {
        let result = Cli::try_parse_from(["htmlguard", "--policy", "p.json", "--escape"]);
        assert!(result.is_err());
    }

    #[test]
    fn unreadable_policy_is_an_error() {
        let cli = Cli::try_parse_from(["htmlguard", "--policy", "/nonexistent/policy.json"]).unwrap();
        let error = builder_from_cli(&cli).err().unwrap();
        assert!(error.to_string().contains("failed to open policy"));
    }
}
