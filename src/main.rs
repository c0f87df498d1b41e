use grpc_broker::application_port::AuthError;
use grpc_broker::broker::Broker;
use grpc_broker::domain_model::{Principal, TokenRecord};
use grpc_broker::logger::*;
use grpc_broker::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
        file: project_settings.log.file.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let broker = Broker::try_new(&project_settings)?;

    match cli.command {
        Command::Login { user, service: _ } => {
            let principal = user.map(Principal::User).unwrap_or(Principal::Service);
            match broker.auth.authenticate(principal).await {
                Ok(record) => print_session(principal, &record),
                Err(AuthError::PrincipalNotRegistered(principal)) => {
                    warn!(%principal, "not registered, run `register` first");
                    return Err(anyhow::anyhow!("{} is not registered", principal));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Register { user, username } => match broker.auth.register(user, &username).await {
            Ok(record) => print_session(Principal::User(user), &record),
            Err(AuthError::AlreadyRegistered(principal)) => {
                println!("{} is already registered", principal);
            }
            Err(e) => return Err(e.into()),
        },
        Command::Logout { user } => {
            let principal = Principal::User(user);
            // Sessions are in memory only, so a fresh process has to log in
            // before there is anything to drop.
            info!(%principal, "logging in to obtain the session to drop");
            broker.auth.authenticate(principal).await?;
            let record = broker.auth.logout(principal).await?;
            println!("session of {} dropped", principal);
            print_session(principal, &record);
        }
    }

    Ok(())
}

fn print_session(principal: Principal, record: &TokenRecord) {
    let fmt = |at: Option<chrono::DateTime<chrono::Utc>>| {
        at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    };
    println!("principal:          {}", principal);
    println!("access expires at:  {}", fmt(record.access_expires_at()));
    println!("refresh expires at: {}", fmt(record.refresh_expires_at()));
}
