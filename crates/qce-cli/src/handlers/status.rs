//! `qce status`

use anyhow::Result;
use qce_core::QceError;

use crate::context::CliContext;

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let (_, source) = ctx.resolver.resolve_with_source(ctx.token.as_deref())?;
    let client = ctx.client()?;

    println!("Server:    {}", client.base_url());
    println!("Token:     from {source}");

    if !client.is_connected().await {
        println!("Health:    unreachable");
        return Err(QceError::Network(format!("no response from {}", client.base_url())).into());
    }
    println!("Health:    ok");

    let info = client.system_info().await?;
    println!("Version:   {}", info.version);
    println!(
        "NapCat:    {}",
        if info.napcat.online { "online" } else { "offline" }
    );
    if let Some(me) = &info.napcat.self_info {
        println!("Account:   {} ({})", me.nick, me.uin);
    }
    println!(
        "Runtime:   node {} on {}, up {:.0}s",
        info.runtime.node_version, info.runtime.platform, info.runtime.uptime
    );

    match client.security_status().await {
        Ok(security) => println!("Security:  {}", serde_json::to_string_pretty(&security)?),
        Err(e) => println!("Security:  unavailable ({e})"),
    }
    Ok(())
}
