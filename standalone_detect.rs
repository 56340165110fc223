use nft_openaction_kit::{KitConfig, MintRecord, NftOpenActionKit};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: standalone_detect <content-url> [publishing-client-profile-id]");
        std::process::exit(2);
    };
    let profile_id = args.next().unwrap_or_else(|| "1".to_string());

    println!("🔎 STANDALONE DETECTION");
    println!("{}", "=".repeat(60));

    let kit = NftOpenActionKit::new(KitConfig::load_from_env())?;
    println!("Platforms: {}", kit.platform_names().join(", "));

    match kit.detection().detect_nft_details(&url).await? {
        Some(reference) => println!(
            "✅ {} on {}: contract {} token {}",
            reference.platform_name, reference.details.chain, reference.details.contract_address, reference.details.token_id
        ),
        None => {
            println!("❌ No platform matched {}", url);
            return Ok(());
        }
    }

    match kit.detect_and_return_calldata(&url, &profile_id).await? {
        Some(calldata) => {
            let record = MintRecord::decode(&calldata)?;
            println!("Init data: {}", calldata);
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "platformName": record.platform_name,
                    "chainId": record.chain_id.to_string(),
                    "targetContract": record.target_contract.to_checksum(None),
                    "tokenId": record.token_id.to_string(),
                    "signature": record.signature,
                }))?
            );
        }
        None => println!("⚠️  Detected, but nothing is mintable right now"),
    }

    Ok(())
}
