//! `{placeholder}` expansion for configured external commands

use std::collections::HashMap;

use anyhow::{anyhow, bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern for {name} placeholders
static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Expand a command template.
///
/// `lists` entries only expand when they fill a whole argument
/// (`{sources}` becomes one argument per element). `vars` expand anywhere.
pub fn expand(
    template: &[String],
    vars: &HashMap<&str, String>,
    lists: &HashMap<&str, Vec<String>>,
) -> Result<Vec<String>> {
    if template.is_empty() {
        bail!("command template is empty");
    }

    let mut out = Vec::with_capacity(template.len());
    for arg in template {
        if let Some(name) = whole_placeholder(arg) {
            if let Some(items) = lists.get(name) {
                out.extend(items.iter().cloned());
                continue;
            }
        }

        let mut missing = None;
        let expanded = PLACEHOLDER.replace_all(arg, |cap: &regex::Captures| {
            let name = &cap[1];
            match vars.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });
        if let Some(name) = missing {
            return Err(anyhow!("placeholder {{{}}} has no value in '{}'", name, arg));
        }
        out.push(expanded.into_owned());
    }
    Ok(out)
}

fn whole_placeholder(arg: &str) -> Option<&str> {
    arg.strip_prefix('{')?.strip_suffix('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn expands_scalars_inside_arguments() {
        let vars = HashMap::from([("out", "t/app.jar".to_string()), ("dir", "t/classes".to_string())]);
        let cmd = expand(
            &template(&["jar", "cf", "{out}", "-C", "{dir}", "--name={out}"]),
            &vars,
            &HashMap::new(),
        )
        .unwrap();
        assert_eq!(cmd, ["jar", "cf", "t/app.jar", "-C", "t/classes", "--name=t/app.jar"]);
    }

    #[test]
    fn list_placeholder_spreads_into_arguments() {
        let lists = HashMap::from([("sources", vec!["src".to_string(), "gen".to_string()])]);
        let cmd = expand(&template(&["javac", "{sources}"]), &HashMap::new(), &lists).unwrap();
        assert_eq!(cmd, ["javac", "src", "gen"]);
    }

    #[test]
    fn missing_value_is_an_error() {
        let err = expand(&template(&["jar", "cfe", "{main}"]), &HashMap::new(), &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("{main}"));
    }

    #[test]
    fn empty_template_is_an_error() {
        assert!(expand(&[], &HashMap::new(), &HashMap::new()).is_err());
    }
}
