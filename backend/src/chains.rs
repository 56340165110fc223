use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};

/// Destination chains an NFT can live on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Zora,
    Optimism,
    Base,
    Ethereum,
    Polygon,
    Arbitrum,
}

pub const DESTINATION_CHAINS: [Chain; 6] = [
    Chain::Zora,
    Chain::Optimism,
    Chain::Base,
    Chain::Ethereum,
    Chain::Polygon,
    Chain::Arbitrum,
];

impl Chain {
    pub fn id(&self) -> u64 {
        match self {
            Chain::Zora => 7_777_777,
            Chain::Optimism => 10,
            Chain::Base => 8453,
            Chain::Ethereum => 1,
            Chain::Polygon => 137,
            Chain::Arbitrum => 42161,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Zora => "zora",
            Chain::Optimism => "optimism",
            Chain::Base => "base",
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
        }
    }

    pub fn from_id(id: u64) -> Option<Self> {
        DESTINATION_CHAINS.into_iter().find(|chain| chain.id() == id)
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Chain::Zora => "https://rpc.zora.energy",
            Chain::Optimism => "https://mainnet.optimism.io",
            Chain::Base => "https://mainnet.base.org",
            Chain::Ethereum => "https://eth.llamarpc.com",
            Chain::Polygon => "https://polygon-rpc.com",
            Chain::Arbitrum => "https://arb1.arbitrum.io/rpc",
        }
    }

    /// Chain prefix used in `zora.co/collect/<key>:<address>` URLs.
    pub fn zora_key(&self) -> Option<&'static str> {
        match self {
            Chain::Zora => Some("zora"),
            Chain::Ethereum => Some("eth"),
            Chain::Base => Some("base"),
            Chain::Optimism => Some("oeth"),
            Chain::Arbitrum => Some("arb"),
            Chain::Polygon => None,
        }
    }

    pub fn from_zora_key(key: &str) -> Option<Self> {
        match key {
            "zora" => Some(Chain::Zora),
            "eth" => Some(Chain::Ethereum),
            "base" => Some(Chain::Base),
            "oeth" => Some(Chain::Optimism),
            "arb" => Some(Chain::Arbitrum),
            _ => None,
        }
    }

    /// Chain segment of OpenSea asset URLs and API paths.
    pub fn opensea_slug(&self) -> &'static str {
        match self {
            Chain::Polygon => "matic",
            other => other.as_str(),
        }
    }

    pub fn from_opensea_slug(slug: &str) -> Option<Self> {
        match slug {
            "ethereum" => Some(Chain::Ethereum),
            "matic" => Some(Chain::Polygon),
            "optimism" => Some(Chain::Optimism),
            "arbitrum" => Some(Chain::Arbitrum),
            "zora" => Some(Chain::Zora),
            "base" => Some(Chain::Base),
            _ => None,
        }
    }
}

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.id())
    }
}

/// Zora sale contracts deployed on a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoraContracts {
    pub fixed_price_strategy: Address,
    pub timed_sale_strategy: Address,
    pub erc20_minter: Address,
}

const ZORA_TIMED_SALE_STRATEGY: Address = address!("777777722D078c97c6ad07d9f36801e653E356Ae");
const ZORA_ERC20_MINTER: Address = address!("777777E8850d8D6d98De2B5f64fae401F96eFF31");
const ZORA_FIXED_PRICE_STRATEGY: Address = address!("04E2516A2c207E84a1839755675dfd8eF6302F0a");
const ZORA_FIXED_PRICE_STRATEGY_OPTIMISM: Address =
    address!("3678862f04290E565cCA2EF163BAeb92Bb76790C");
const ZORA_FIXED_PRICE_STRATEGY_ARBITRUM: Address =
    address!("1Cd1C1f3b8B779B50Db23155F2Cb244FCcA06B21");

pub fn zora_contracts(chain: Chain) -> Option<ZoraContracts> {
    let fixed_price_strategy = match chain {
        Chain::Zora | Chain::Ethereum | Chain::Base => ZORA_FIXED_PRICE_STRATEGY,
        Chain::Optimism => ZORA_FIXED_PRICE_STRATEGY_OPTIMISM,
        Chain::Arbitrum => ZORA_FIXED_PRICE_STRATEGY_ARBITRUM,
        Chain::Polygon => return None,
    };

    Some(ZoraContracts {
        fixed_price_strategy,
        timed_sale_strategy: ZORA_TIMED_SALE_STRATEGY,
        erc20_minter: ZORA_ERC20_MINTER,
    })
}

/// ERC-1155 minter that Pods drops are sold through.
pub fn pods_minter(chain: Chain) -> Option<Address> {
    match chain {
        Chain::Zora | Chain::Base | Chain::Ethereum => Some(ZORA_FIXED_PRICE_STRATEGY),
        Chain::Optimism => Some(ZORA_FIXED_PRICE_STRATEGY_OPTIMISM),
        Chain::Polygon | Chain::Arbitrum => None,
    }
}

/// Protocol contracts carried alongside a detected NFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolContracts {
    Zora(ZoraContracts),
    Pods { minter: Address },
    Marketplace,
}

impl ProtocolContracts {
    pub fn zora(&self) -> Option<&ZoraContracts> {
        match self {
            ProtocolContracts::Zora(contracts) => Some(contracts),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_id_lookup() {
        for chain in DESTINATION_CHAINS {
            assert_eq!(Chain::from_id(chain.id()), Some(chain));
        }
        assert_eq!(Chain::from_id(8453), Some(Chain::Base));
        assert_eq!(Chain::from_id(56), None);
    }

    #[test]
    fn test_zora_keys_round_trip() {
        for chain in DESTINATION_CHAINS {
            if let Some(key) = chain.zora_key() {
                assert_eq!(Chain::from_zora_key(key), Some(chain));
            }
        }
        assert_eq!(Chain::from_zora_key("oeth"), Some(Chain::Optimism));
        assert_eq!(Chain::from_zora_key("matic"), None);
    }

    #[test]
    fn test_zora_strategy_table() {
        let base = zora_contracts(Chain::Base).unwrap();
        assert_eq!(base.fixed_price_strategy, ZORA_FIXED_PRICE_STRATEGY);
        assert_eq!(base.timed_sale_strategy, ZORA_TIMED_SALE_STRATEGY);

        let optimism = zora_contracts(Chain::Optimism).unwrap();
        assert_eq!(optimism.fixed_price_strategy, ZORA_FIXED_PRICE_STRATEGY_OPTIMISM);
        assert!(zora_contracts(Chain::Polygon).is_none());
    }

    #[test]
    fn test_opensea_slugs() {
        assert_eq!(Chain::Polygon.opensea_slug(), "matic");
        assert_eq!(Chain::from_opensea_slug("matic"), Some(Chain::Polygon));
        assert_eq!(Chain::from_opensea_slug("solana"), None);
    }
}
