//! Manipulation de l'arbre YAML : fusion, normalisation des clés, chemins

use anyhow::{Result, anyhow};
use serde_yaml::{Mapping, Value};

/// Met toutes les clés textuelles en minuscules, récursivement
pub(crate) fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, child)| {
                    let key = match key {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (key, lowercase_keys(child))
                })
                .collect(),
        ),
        Value::Sequence(items) => Value::Sequence(items.into_iter().map(lowercase_keys).collect()),
        other => other,
    }
}

/// Fusionne `overlay` dans `base`
///
/// Les mappings sont fusionnés clé par clé ; tout autre nœud de `overlay`
/// remplace celui de `base`. Un `overlay` nul ne change rien.
pub(crate) fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, child) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge(existing, child),
                    None => {
                        base_map.insert(key.clone(), child.clone());
                    }
                }
            }
        }
        (slot, replacement) => *slot = replacement.clone(),
    }
}

fn key(segment: &str) -> Value {
    Value::String(segment.to_lowercase())
}

/// Nœud situé au bout de `path`
pub(crate) fn lookup<'a>(root: &'a Value, path: &[&str]) -> Result<&'a Value> {
    path.iter().enumerate().try_fold(root, |node, (depth, segment)| {
        let Value::Mapping(map) = node else {
            return Err(anyhow!("{} is not a mapping", path[..depth].join(".")));
        };
        map.get(key(segment))
            .ok_or_else(|| anyhow!("Path {} does not exist", path[..=depth].join(".")))
    })
}

/// Remplace (ou crée) le nœud au bout de `path`
///
/// Les mappings intermédiaires manquants sont créés.
pub(crate) fn assign(root: &mut Value, path: &[&str], value: Value) -> Result<()> {
    let Some((last, parents)) = path.split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for segment in parents {
        let Value::Mapping(map) = node else {
            return Err(anyhow!("Cannot descend into {}: not a mapping", segment));
        };
        node = map
            .entry(key(segment))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }

    match node {
        Value::Mapping(map) => {
            map.insert(key(last), value);
            Ok(())
        }
        _ => Err(anyhow!("Cannot set {}: parent is not a mapping", path.join("."))),
    }
}

/// Lit une valeur d'environnement comme un scalaire YAML (`8080`, `true`, ...)
pub(crate) fn parse_scalar(raw: &str) -> Value {
    serde_yaml::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Surcharges `PREFIX` + `A__B=valeur` extraites des variables fournies
pub(crate) fn env_overrides<I>(vars: I, prefix: &str) -> Vec<(Vec<String>, Value)>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, raw)| {
            let rest = name.strip_prefix(prefix)?;
            let path: Vec<String> = rest
                .split("__")
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
                .collect();
            (!path.is_empty()).then(|| (path, parse_scalar(&raw)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_merge_keeps_nested_defaults() {
        let mut base = yaml("a:\n  b: 1\n  c: 2\n");
        merge(&mut base, &yaml("a:\n  c: 3\n"));
        assert_eq!(base, yaml("a:\n  b: 1\n  c: 3\n"));
    }

    #[test]
    fn test_merge_ignores_null_overlay() {
        let mut base = yaml("a: 1\n");
        merge(&mut base, &Value::Null);
        assert_eq!(base, yaml("a: 1\n"));
    }

    #[test]
    fn test_lowercase_keys() {
        let value = lowercase_keys(yaml("Host:\n  HTTP_Port: 1\n"));
        assert_eq!(value, yaml("host:\n  http_port: 1\n"));
    }

    #[test]
    fn test_lookup_and_assign() {
        let mut root = yaml("host:\n  http_port: 8000\n");
        assign(&mut root, &["tracks", "directory"], Value::String("t".into())).unwrap();
        assert_eq!(
            lookup(&root, &["TRACKS", "directory"]).unwrap(),
            &Value::String("t".into())
        );
        assert!(lookup(&root, &["host", "missing"]).is_err());
        assert!(assign(&mut root, &["host", "http_port", "x"], Value::Null).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let vars = vec![
            ("MIXDECK_CONFIG__HOST__HTTP_PORT".to_string(), "9001".to_string()),
            ("MIXDECK_CONFIG__TRACKS__DIRECTORY".to_string(), "/srv/audio".to_string()),
            ("MIXDECK_CONFIG".to_string(), "/etc/mixdeck".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];
        let overrides = env_overrides(vars, "MIXDECK_CONFIG__");
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides[0].0, vec!["host", "http_port"]);
        assert_eq!(overrides[0].1, yaml("9001"));
        assert_eq!(overrides[1].1, Value::String("/srv/audio".into()));
    }
}
