use vibelist_lib::ai::CredentialManager;
use vibelist_lib::config::Config;

const USAGE: &str = "usage: vibelist [set-api-key <key> | delete-api-key]";

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    vibelist_lib::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.as_slice() {
        [] => vibelist_lib::run(Config::from_env())
            .await
            .map_err(|e| e.to_string()),
        [cmd, key] if cmd == "set-api-key" => {
            CredentialManager::store_api_key(key).map_err(|e| e.to_string())
        }
        [cmd] if cmd == "delete-api-key" => {
            CredentialManager::delete_api_key().map_err(|e| e.to_string())
        }
        _ => Err(USAGE.to_string()),
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
