use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use conta_core::{AccountKind, Field, StatementFilter, Subtype};
use tracing_subscriber::EnvFilter;

mod config;
mod flows;
mod state;
mod terminal;

use config::{init_config, load_config};

#[derive(Parser, Debug)]
#[command(name = "conta", version, about = "Conta banking client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in as an account holder and load the checking account
    Login {
        #[arg(long)]
        holder_id: u64,
    },

    /// Forget the signed-in holder
    Logout,

    /// Holder name and current balance
    Home,

    /// List transactions, most recent first
    Statement {
        #[arg(long, value_enum, default_value_t = AccountArg::Checking)]
        account: AccountArg,

        #[arg(long, value_enum, default_value_t = FilterArg::All)]
        filter: FilterArg,
    },

    /// Pay a boleto (password read from stdin)
    Pay {
        #[arg(long, value_enum, default_value_t = PayKind::Boleto)]
        kind: PayKind,

        /// Boleto code; prompted when omitted
        #[arg(long)]
        code: Option<String>,
    },

    /// Transfer to a CPF/CNPJ (password read from stdin)
    Transfer {
        #[arg(long)]
        document: Option<String>,

        #[arg(long)]
        amount: Option<String>,

        /// Routing data, asked only for payees outside the bank
        #[arg(long)]
        bank: Option<String>,

        #[arg(long)]
        agency: Option<String>,

        #[arg(long)]
        account: Option<String>,

        #[arg(long)]
        kind: Option<String>,
    },

    /// Manage ~/.conta/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config
    Show,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum AccountArg {
    Checking,
    Savings,
    Investment,
}

impl From<AccountArg> for AccountKind {
    fn from(arg: AccountArg) -> Self {
        match arg {
            AccountArg::Checking => AccountKind::Checking,
            AccountArg::Savings => AccountKind::Savings,
            AccountArg::Investment => AccountKind::Investment,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FilterArg {
    All,
    Credits,
    Debits,
}

impl From<FilterArg> for StatementFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::All => StatementFilter::All,
            FilterArg::Credits => StatementFilter::Credits,
            FilterArg::Debits => StatementFilter::Debits,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PayKind {
    Boleto,
    Tax,
    Recharge,
}

impl From<PayKind> for Subtype {
    fn from(kind: PayKind) -> Self {
        match kind {
            PayKind::Boleto => Subtype::Boleto,
            PayKind::Tax => Subtype::Tax,
            PayKind::Recharge => Subtype::PhoneRecharge,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log.filter)))
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Login { holder_id } => flows::login(&cfg, holder_id).await?,
        Command::Logout => flows::logout()?,
        Command::Home => flows::home(&cfg).await?,
        Command::Statement { account, filter } => {
            flows::statement(&cfg, account.into(), filter.into()).await?;
        }
        Command::Pay { kind, code } => flows::pay(&cfg, kind.into(), code).await?,
        Command::Transfer {
            document,
            amount,
            bank,
            agency,
            account,
            kind,
        } => {
            let presets = [
                (Field::PayeeDocument, document),
                (Field::Amount, amount),
                (Field::Bank, bank),
                (Field::Agency, agency),
                (Field::AccountNumber, account),
                (Field::TransferKind, kind),
            ]
            .into_iter()
            .filter_map(|(field, value)| value.map(|v| (field, v)))
            .collect();
            flows::transfer(&cfg, presets).await?;
        }
        Command::Config { command } => match command {
            ConfigCommand::Init => init_config()?,
            ConfigCommand::Show => {
                println!("{}", toml::to_string_pretty(&cfg)?);
            }
        },
    }

    Ok(())
}
