//! The six Ichimoku rule predicates.
//!
//! Each rule compares the previous and current snapshot of an
//! [`IchimokuFrame`]. Any undefined operand makes the rule return `false`;
//! there is no default value and no error.

use crate::domain::SignalType;
use crate::indicators::{CloudPosition, IchimokuFrame};

/// Tenkan ≤ Kijun on the previous bar, Tenkan > Kijun now.
pub fn tk_cross_up(frame: &IchimokuFrame) -> bool {
    let (Some(pt), Some(pk), Some(ct), Some(ck)) = (
        frame.previous.tenkan,
        frame.previous.kijun,
        frame.current.tenkan,
        frame.current.kijun,
    ) else {
        return false;
    };
    pt <= pk && ct > ck
}

/// Tenkan ≥ Kijun on the previous bar, Tenkan < Kijun now.
pub fn tk_cross_down(frame: &IchimokuFrame) -> bool {
    let (Some(pt), Some(pk), Some(ct), Some(ck)) = (
        frame.previous.tenkan,
        frame.previous.kijun,
        frame.current.tenkan,
        frame.current.kijun,
    ) else {
        return false;
    };
    pt >= pk && ct < ck
}

/// Close at or below the cloud top on the previous bar, above it now.
pub fn kumo_breakout_up(frame: &IchimokuFrame) -> bool {
    let (Some(prev_top), Some(top)) = (frame.previous.cloud_top(), frame.current.cloud_top())
    else {
        return false;
    };
    frame.previous.close <= prev_top && frame.current.close > top
}

/// Close at or above the cloud bottom on the previous bar, below it now.
pub fn kumo_breakout_down(frame: &IchimokuFrame) -> bool {
    let (Some(prev_bottom), Some(bottom)) =
        (frame.previous.cloud_bottom(), frame.current.cloud_bottom())
    else {
        return false;
    };
    frame.previous.close >= prev_bottom && frame.current.close < bottom
}

/// Chikou at or below its reference close on the previous bar, above it now.
pub fn chikou_cross_up(frame: &IchimokuFrame) -> bool {
    let (Some(pc), Some(pr), Some(cc), Some(cr)) = (
        frame.previous.chikou,
        frame.previous.chikou_reference,
        frame.current.chikou,
        frame.current.chikou_reference,
    ) else {
        return false;
    };
    pc <= pr && cc > cr
}

/// Chikou at or above its reference close on the previous bar, below it now.
pub fn chikou_cross_down(frame: &IchimokuFrame) -> bool {
    let (Some(pc), Some(pr), Some(cc), Some(cr)) = (
        frame.previous.chikou,
        frame.previous.chikou_reference,
        frame.current.chikou,
        frame.current.chikou_reference,
    ) else {
        return false;
    };
    pc >= pr && cc < cr
}

/// Cloud filter for TK crosses: BUY needs price above the cloud, SELL below.
/// An undefined cloud fails the filter. Other rules pass unconditionally.
pub fn passes_cloud_filter(signal_type: SignalType, frame: &IchimokuFrame) -> bool {
    let position = frame.current.cloud_position();
    match signal_type {
        SignalType::TkCrossUp => position == Some(CloudPosition::Above),
        SignalType::TkCrossDown => position == Some(CloudPosition::Below),
        _ => true,
    }
}

/// Evaluate one rule, applying the cloud filter when enabled.
pub fn rule_fires(signal_type: SignalType, frame: &IchimokuFrame, cloud_filter: bool) -> bool {
    let triggered = match signal_type {
        SignalType::TkCrossUp => tk_cross_up(frame),
        SignalType::TkCrossDown => tk_cross_down(frame),
        SignalType::KumoBreakoutUp => kumo_breakout_up(frame),
        SignalType::KumoBreakoutDown => kumo_breakout_down(frame),
        SignalType::ChikouCrossUp => chikou_cross_up(frame),
        SignalType::ChikouCrossDown => chikou_cross_down(frame),
    };
    triggered && (!cloud_filter || passes_cloud_filter(signal_type, frame))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IchimokuSnapshot;

    /// Neutral frame: no rule fires. Price 1.1000 sits above a 1.0960–1.0980 cloud.
    fn base_frame() -> IchimokuFrame {
        let snap = IchimokuSnapshot {
            close: 1.1000,
            tenkan: Some(1.1005),
            kijun: Some(1.1010),
            senkou_a: Some(1.0980),
            senkou_b: Some(1.0960),
            chikou: Some(1.1000),
            chikou_reference: Some(1.1000),
        };
        let mut previous = snap;
        previous.close = 1.0999;
        previous.tenkan = Some(1.1004);
        IchimokuFrame {
            previous,
            current: snap,
        }
    }

    #[test]
    fn baseline_fires_nothing() {
        let frame = base_frame();
        for st in SignalType::ALL {
            assert!(!rule_fires(st, &frame, false), "{st} fired on neutral frame");
        }
    }

    #[test]
    fn tk_cross_up_fires_on_cross() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1000);
        f.previous.kijun = Some(1.1005);
        f.current.tenkan = Some(1.1010);
        f.current.kijun = Some(1.1005);
        assert!(tk_cross_up(&f));
        assert!(!tk_cross_down(&f));
    }

    #[test]
    fn tk_cross_up_counts_touch_as_below() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1005);
        f.previous.kijun = Some(1.1005);
        f.current.tenkan = Some(1.1010);
        f.current.kijun = Some(1.1005);
        assert!(tk_cross_up(&f));
    }

    #[test]
    fn tk_cross_up_needs_cross() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1010);
        f.previous.kijun = Some(1.1005);
        f.current.tenkan = Some(1.1012);
        f.current.kijun = Some(1.1005);
        assert!(!tk_cross_up(&f));
    }

    #[test]
    fn tk_cross_down_fires_on_cross() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1010);
        f.previous.kijun = Some(1.1005);
        f.current.tenkan = Some(1.1000);
        f.current.kijun = Some(1.1005);
        assert!(tk_cross_down(&f));
        assert!(!tk_cross_up(&f));
    }

    #[test]
    fn cloud_filter_suppresses_tk_up_below_cloud() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.0900);
        f.previous.kijun = Some(1.0905);
        f.current.tenkan = Some(1.0910);
        f.current.kijun = Some(1.0905);
        f.current.close = 1.0850;
        assert!(tk_cross_up(&f));
        assert!(!rule_fires(SignalType::TkCrossUp, &f, true));
        assert!(rule_fires(SignalType::TkCrossUp, &f, false));
    }

    #[test]
    fn cloud_filter_allows_tk_up_above_cloud() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1000);
        f.previous.kijun = Some(1.1005);
        f.current.tenkan = Some(1.1010);
        f.current.kijun = Some(1.1005);
        f.current.close = 1.1050;
        assert!(rule_fires(SignalType::TkCrossUp, &f, true));
    }

    #[test]
    fn cloud_filter_rejects_inside_cloud() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1000);
        f.previous.kijun = Some(1.1005);
        f.current.tenkan = Some(1.1010);
        f.current.kijun = Some(1.1005);
        f.current.close = 1.0970;
        assert!(!rule_fires(SignalType::TkCrossUp, &f, true));
    }

    #[test]
    fn cloud_filter_on_tk_down() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1010);
        f.previous.kijun = Some(1.1005);
        f.current.tenkan = Some(1.1000);
        f.current.kijun = Some(1.1005);
        // Price above the cloud: filtered.
        assert!(!rule_fires(SignalType::TkCrossDown, &f, true));
        f.current.close = 1.0900;
        assert!(rule_fires(SignalType::TkCrossDown, &f, true));
    }

    #[test]
    fn cloud_filter_with_undefined_cloud_blocks_tk() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1000);
        f.previous.kijun = Some(1.1005);
        f.current.tenkan = Some(1.1010);
        f.current.kijun = Some(1.1005);
        f.current.senkou_b = None;
        assert!(!rule_fires(SignalType::TkCrossUp, &f, true));
        assert!(rule_fires(SignalType::TkCrossUp, &f, false));
    }

    #[test]
    fn kumo_breakout_up_and_down() {
        let mut f = base_frame();
        f.previous.close = 1.0975;
        f.current.close = 1.0990;
        assert!(kumo_breakout_up(&f));
        // Filter never affects kumo rules.
        assert!(rule_fires(SignalType::KumoBreakoutUp, &f, true));

        let mut f = base_frame();
        f.previous.close = 1.0965;
        f.current.close = 1.0950;
        assert!(kumo_breakout_down(&f));
        assert!(!kumo_breakout_up(&f));
    }

    #[test]
    fn kumo_breakout_needs_defined_cloud_on_both_bars() {
        let mut f = base_frame();
        f.previous.close = 1.0975;
        f.current.close = 1.0990;
        f.previous.senkou_a = None;
        assert!(!kumo_breakout_up(&f));
    }

    #[test]
    fn chikou_crosses() {
        let mut f = base_frame();
        f.previous.chikou = Some(1.0990);
        f.previous.chikou_reference = Some(1.0995);
        f.current.chikou = Some(1.1010);
        f.current.chikou_reference = Some(1.1000);
        assert!(chikou_cross_up(&f));
        assert!(!chikou_cross_down(&f));

        let mut f = base_frame();
        f.previous.chikou = Some(1.1000);
        f.previous.chikou_reference = Some(1.0995);
        f.current.chikou = Some(1.0990);
        f.current.chikou_reference = Some(1.1000);
        assert!(chikou_cross_down(&f));
    }

    #[test]
    fn undefined_operand_never_fires() {
        let mut f = base_frame();
        f.previous.tenkan = Some(1.1000);
        f.previous.kijun = None;
        f.current.tenkan = Some(1.1010);
        f.current.kijun = Some(1.1005);
        assert!(!tk_cross_up(&f));

        let mut f = base_frame();
        f.previous.chikou_reference = None;
        f.current.chikou = Some(2.0);
        assert!(!chikou_cross_up(&f));
    }
}
