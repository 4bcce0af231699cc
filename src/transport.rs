//! Endpoint/dialer composition model
//!
//! Parsing produces recipes, not sockets. A recipe is an ordered list of
//! [`Layer`]s (outermost physical hop first) plus [`ConnectionInfo`] telling
//! the caller which address is actually contacted and whether the logical
//! connection is tunneled. Wrapping keeps the first hop and forces
//! [`ConnType::Tunneled`], however deep the composition goes.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;

pub mod cipher;

pub use cipher::Cipher;

/// Whether a proxying layer sits between the caller and the first hop
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnType {
    Direct,
    Tunneled,
}

impl fmt::Display for ConnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnType::Direct => write!(f, "direct"),
            ConnType::Tunneled => write!(f, "tunneled"),
        }
    }
}

/// Addressing metadata carried by every endpoint and dialer
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub conn_type: ConnType,
    /// Outermost physical address dialed; empty for a bare passthrough
    /// dialer whose first hop is the destination itself.
    pub first_hop: String,
}

impl ConnectionInfo {
    pub fn direct(first_hop: impl Into<String>) -> Self {
        Self {
            conn_type: ConnType::Direct,
            first_hop: first_hop.into(),
        }
    }

    /// Metadata after a proxying layer is interposed.
    pub fn tunneled(&self) -> Self {
        Self {
            conn_type: ConnType::Tunneled,
            first_hop: self.first_hop.clone(),
        }
    }
}

/// One step of a composed connection
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "layer", rename_all = "lowercase")]
pub enum Layer {
    /// Raw network connection to a fixed `host:port`
    Dial { address: String },
    /// Shadowsocks encryption over the inner connection
    Shadowsocks {
        cipher: Cipher,
        #[serde(skip_serializing)]
        secret: String,
        /// Bytes sent ahead of the salt on new connections
        #[serde(skip_serializing_if = "Option::is_none")]
        prefix: Option<Vec<u8>>,
    },
}

/// Connection flavor carried by a recipe
pub trait ConnKind: fmt::Debug + Clone + Copy + PartialEq + Eq + Send + Sync + 'static {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketConn;

impl ConnKind for StreamConn {
    const NAME: &'static str = "stream";
}

impl ConnKind for PacketConn {
    const NAME: &'static str = "packet";
}

/// Recipe for connections to one fixed address
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(bound = "")]
pub struct Endpoint<C: ConnKind> {
    #[serde(flatten)]
    pub info: ConnectionInfo,
    pub layers: Vec<Layer>,
    #[serde(skip)]
    kind: PhantomData<C>,
}

/// Recipe for connections to arbitrary destinations
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(bound = "")]
pub struct Dialer<C: ConnKind> {
    #[serde(flatten)]
    pub info: ConnectionInfo,
    pub layers: Vec<Layer>,
    #[serde(skip)]
    kind: PhantomData<C>,
}

pub type StreamDialer = Dialer<StreamConn>;
pub type PacketListener = Dialer<PacketConn>;

impl<C: ConnKind> Endpoint<C> {
    /// Direct connection to `address`, which becomes the first hop.
    pub fn direct(address: impl Into<String>) -> Self {
        let address = address.into();
        Self {
            info: ConnectionInfo::direct(address.clone()),
            layers: vec![Layer::Dial { address }],
            kind: PhantomData,
        }
    }

    pub fn first_hop(&self) -> &str {
        &self.info.first_hop
    }

    pub fn conn_type(&self) -> ConnType {
        self.info.conn_type
    }

    /// Adds a layer that keeps addressing the same fixed destination.
    pub fn wrap(mut self, layer: Layer) -> Endpoint<C> {
        self.info = self.info.tunneled();
        self.layers.push(layer);
        self
    }

    /// Turns the endpoint into a dialer by layering a proxy protocol on it.
    pub fn into_dialer(mut self, layer: Layer) -> Dialer<C> {
        self.layers.push(layer);
        Dialer {
            info: self.info.tunneled(),
            layers: self.layers,
            kind: PhantomData,
        }
    }
}

impl<C: ConnKind> Dialer<C> {
    /// Bare passthrough: no layers, the destination is dialed as given.
    pub fn direct() -> Self {
        Self {
            info: ConnectionInfo::direct(""),
            layers: Vec::new(),
            kind: PhantomData,
        }
    }

    pub fn first_hop(&self) -> &str {
        &self.info.first_hop
    }

    pub fn conn_type(&self) -> ConnType {
        self.info.conn_type
    }

    pub fn wrap(mut self, layer: Layer) -> Dialer<C> {
        self.info = self.info.tunneled();
        self.layers.push(layer);
        self
    }
}

/// Stream dialer and packet listener resolved from one transport config
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct TransportPair {
    pub stream_dialer: StreamDialer,
    pub packet_listener: PacketListener,
}
