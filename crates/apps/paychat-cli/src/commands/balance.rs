//! Show balance command.

use paychat_settle::BalanceOracle;
use paychat_types::{AccountRef, TokenAmount};

use crate::config::CliConfig;
use crate::context::ChatContext;
use crate::error::CliResult;
use crate::output::{BalanceOutput, OutputFormat, Render};

/// Execute the balance command.
pub async fn balance(config: CliConfig, format: OutputFormat) -> CliResult<String> {
    let price = config.price()?;
    let symbol = config.payment.token_symbol.clone();
    let ctx = ChatContext::new(config)?;
    let account = AccountRef::new(ctx.config.account()?);

    let output = report(ctx.oracle.as_ref(), account, price, symbol).await?;
    Ok(output.render(format))
}

async fn report(
    oracle: &dyn BalanceOracle,
    account: AccountRef,
    price: TokenAmount,
    symbol: String,
) -> CliResult<BalanceOutput> {
    let available = oracle.balance(&account).await?;
    let messages_affordable = available.units().checked_div(price.units()).unwrap_or(0);

    Ok(BalanceOutput {
        account: account.to_string(),
        balance: available.to_fixed(2),
        symbol,
        price: price.to_string(),
        messages_affordable,
    })
}
