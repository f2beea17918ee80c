//! Interception strategy trait
//!
//! Provides the [`InterceptionStrategy`] trait: one implementation per
//! [`ProtocolKind`], each knowing how call arguments of that protocol are
//! reduced for matching and how responses reach the call site.

use atk_core::{
    ArgMatcher, ArgShape, CallStyle, InterceptionSpec, Packaging, ProtocolKind, Value,
};

/// Builds interceptions for one call protocol
pub trait InterceptionStrategy: Send + Sync + std::fmt::Debug {
    /// Protocol this strategy handles
    fn protocol(&self) -> ProtocolKind;

    /// How live arguments are reduced for payload matching
    fn arg_shape(&self) -> ArgShape;

    /// How responses are wrapped for the call site
    fn packaging(&self) -> Packaging {
        Packaging::Raw
    }

    /// Blocking or awaited call sites
    fn call_style(&self) -> CallStyle {
        self.protocol().call_style()
    }

    /// Strategy name (for logging)
    fn name(&self) -> &'static str;

    /// Build an interception for `address`
    ///
    /// Without a payload (or with a `null` one) the interception is
    /// unconditional. With a payload, calls whose reduced arguments differ
    /// from the reduced payload fail at call time.
    fn build(&self, address: &str, payload: Option<&Value>, return_value: Value) -> InterceptionSpec {
        let method = self.call_style().method();
        let payload = payload.filter(|p| !p.is_null());
        let spec = match payload {
            None => InterceptionSpec::unconditional(address, method, return_value),
            Some(payload) => InterceptionSpec::matching(
                address,
                method,
                ArgMatcher::from_payload(self.arg_shape(), payload),
                return_value,
            ),
        };
        tracing::debug!(
            strategy = self.name(),
            address,
            conditional = payload.is_some(),
            "Built interception"
        );
        spec.with_protocol(self.protocol())
            .with_packaging(self.packaging())
    }
}
