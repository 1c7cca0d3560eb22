use crate::core::Config;
use log::trace;

/// Realms to cross to go from `client_realm` to `server_realm`, both
/// included. The configured capaths take precedence over the
/// hierarchical path.
pub fn realm_path(
    config: &Config,
    client_realm: &str,
    server_realm: &str,
) -> Vec<String> {
    if client_realm == server_realm {
        return vec![client_realm.to_string()];
    }

    if let Some(intermediates) = config
        .capaths
        .get(client_realm)
        .and_then(|targets| targets.get(server_realm))
    {
        let mut path = vec![client_realm.to_string()];
        path.extend(
            intermediates
                .iter()
                .filter(|realm| realm.as_str() != ".")
                .cloned(),
        );
        path.push(server_realm.to_string());
        trace!("Capath from {} to {}: {:?}", client_realm, server_realm, path);
        return path;
    }

    return hierarchical_path(client_realm, server_realm);
}

/// Path that goes up from the client realm to the common parent and then
/// down to the server realm. Realms without common parent are directly
/// connected.
fn hierarchical_path(client_realm: &str, server_realm: &str) -> Vec<String> {
    let client_parts: Vec<&str> = client_realm.split('.').collect();
    let server_parts: Vec<&str> = server_realm.split('.').collect();

    let common = client_parts
        .iter()
        .rev()
        .zip(server_parts.iter().rev())
        .take_while(|(c, s)| c == s)
        .count();

    if common == 0 {
        return vec![client_realm.to_string(), server_realm.to_string()];
    }

    let mut path = Vec::new();
    for i in 0..(client_parts.len() - common) {
        path.push(client_parts[i..].join("."));
    }
    path.push(client_parts[client_parts.len() - common..].join("."));
    for i in (0..(server_parts.len() - common)).rev() {
        path.push(server_parts[i..].join("."));
    }

    path.dedup();
    return path;
}

/// Realm guessed from the domain of a host, used when the KDC does not
/// know the realm of a service.
pub fn fallback_realm(host: &str) -> Option<String> {
    let host = host.trim_end_matches('.');
    let dot = host.find('.')?;
    let domain = &host[dot + 1..];
    if domain.is_empty() {
        return None;
    }
    return Some(domain.to_uppercase());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_realm() {
        let config = Config::default();
        assert_eq!(vec!["A.COM"], realm_path(&config, "A.COM", "A.COM"));
    }

    #[test]
    fn test_hierarchical_path() {
        let config = Config::default();
        assert_eq!(
            vec!["A.EXAMPLE.COM", "EXAMPLE.COM", "B.EXAMPLE.COM"],
            realm_path(&config, "A.EXAMPLE.COM", "B.EXAMPLE.COM")
        );
        assert_eq!(
            vec!["X.A.EXAMPLE.COM", "A.EXAMPLE.COM", "EXAMPLE.COM"],
            realm_path(&config, "X.A.EXAMPLE.COM", "EXAMPLE.COM")
        );
        assert_eq!(
            vec!["EXAMPLE.COM", "B.EXAMPLE.COM", "Y.B.EXAMPLE.COM"],
            realm_path(&config, "EXAMPLE.COM", "Y.B.EXAMPLE.COM")
        );
        assert_eq!(vec!["A.COM", "B.ORG"], realm_path(&config, "A.COM", "B.ORG"));
    }

    #[test]
    fn test_capaths_take_precedence() {
        let config = Config::default()
            .capath("A.COM", "C.COM", vec!["B.COM".into()])
            .capath("A.COM", "D.COM", vec![".".into()]);

        assert_eq!(
            vec!["A.COM", "B.COM", "C.COM"],
            realm_path(&config, "A.COM", "C.COM")
        );
        assert_eq!(vec!["A.COM", "D.COM"], realm_path(&config, "A.COM", "D.COM"));
    }

    #[test]
    fn test_fallback_realm() {
        assert_eq!(Some("B.COM".to_string()), fallback_realm("fs.b.com"));
        assert_eq!(Some("B.COM".to_string()), fallback_realm("fs.b.com."));
        assert_eq!(
            Some("SUB.B.COM".to_string()),
            fallback_realm("fs.sub.b.com")
        );
        assert_eq!(None, fallback_realm("localhost"));
    }
}
