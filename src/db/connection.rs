use anyhow::{anyhow, Result};

use crate::config::ConnectionSettings;

const APPLICATION_NAME: &str = "data-diff";

pub fn build_config(settings: &ConnectionSettings) -> Result<tiberius::Config> {
    let mut config = tiberius::Config::new();
    config.host(&settings.server);
    config.port(settings.port);
    config.database(&settings.database);
    config.application_name(APPLICATION_NAME);

    match (&settings.user, &settings.password) {
        (Some(user), Some(pass)) => {
            config.authentication(tiberius::AuthMethod::sql_server(user, pass));
        }
        (Some(user), None) => {
            return Err(anyhow!(
                "Password is required for SQL authentication (user: {})",
                user
            ));
        }
        _ => {}
    }

    if settings.encrypt {
        config.encryption(tiberius::EncryptionLevel::Required);
    } else {
        config.encryption(tiberius::EncryptionLevel::NotSupported);
    }

    if settings.trust_cert {
        config.trust_cert();
    }

    Ok(config)
}

/// `host:port/database` for log lines; never includes credentials.
pub fn describe_target(settings: &ConnectionSettings) -> String {
    format!("{}:{}/{}", settings.server, settings.port, settings.database)
}
