// Unit tests for translating eye data into outbound OSC messages.

use crate::config::OscConfig;
use crate::eye::{EyeData, EyeId};
use crate::osc::OutboundRoutes;

fn routes() -> OutboundRoutes {
    OutboundRoutes::from(&OscConfig::default())
}

/// **VALUE**: With default settings a left-eye item with eyelid state produces
/// exactly the left X and left eyelid messages.
///
/// **BUG THIS CATCHES**: Sending to the right-eye paths, or always emitting
/// `EyesY`, would move the wrong avatar parameters.
#[test]
fn given_left_item_with_blink_when_translated_then_two_left_messages() {
    let item = EyeData::new(EyeId::Left, 0.4).with_blink(0.9);

    let routes = routes();
    let messages = routes.messages(&item);

    assert_eq!(
        messages,
        vec![
            ("/avatar/parameters/LeftEyeX", 0.4),
            ("/avatar/parameters/LeftEyeLidExpandedSqueeze", 0.9),
        ]
    );
}

#[test]
fn given_right_item_without_blink_when_translated_then_only_x() {
    let routes = routes();

    let messages = routes.messages(&EyeData::new(EyeId::Right, -0.2));

    assert_eq!(messages, vec![("/avatar/parameters/RightEyeX", -0.2)]);
}

#[test]
fn given_vertical_value_when_translated_then_sent_to_shared_y_path() {
    let routes = routes();

    let messages = routes.messages(&EyeData::new(EyeId::Right, 0.0).with_y(0.7));

    assert!(messages.contains(&("/avatar/parameters/EyesY", 0.7)));
    assert_eq!(messages.len(), 2);
}

#[test]
fn given_mirror_eyes_when_translated_then_x_goes_to_both_eyes() {
    let routes = OutboundRoutes {
        mirror_eyes: true,
        ..routes()
    };

    let messages = routes.messages(&EyeData::new(EyeId::Left, 0.3));

    assert_eq!(
        messages,
        vec![
            ("/avatar/parameters/LeftEyeX", 0.3),
            ("/avatar/parameters/RightEyeX", 0.3),
        ]
    );
}

#[test]
fn given_sync_blink_when_translated_then_blink_goes_to_both_eyelids() {
    let routes = OutboundRoutes {
        sync_blink: true,
        ..routes()
    };

    let messages = routes.messages(&EyeData::new(EyeId::Right, 0.0).with_blink(0.1));

    assert!(messages.contains(&("/avatar/parameters/RightEyeLidExpandedSqueeze", 0.1)));
    assert!(messages.contains(&("/avatar/parameters/LeftEyeLidExpandedSqueeze", 0.1)));
}

#[test]
fn given_sync_blink_but_no_blink_when_translated_then_no_eyelid_messages() {
    let routes = OutboundRoutes {
        sync_blink: true,
        ..routes()
    };

    let messages = routes.messages(&EyeData::new(EyeId::Left, 0.5));

    assert_eq!(messages.len(), 1);
}
