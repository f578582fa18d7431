//! Static prose tables consumed by the ambient, zone, they-awareness, and
//! bleed layers. Domain-specific prose lives here as data, not behavior.

pub const ZONE_SUBTLE: &[&str] = &[
    "Something at the edge of the conversation feels slightly off-axis.",
    "There is a faint sense of being observed from just outside the frame.",
];

pub const ZONE_MODERATE: &[&str] = &[
    "The boundary between this exchange and something else grows thin.",
    "A seam shows itself, briefly, in the texture of the reply.",
];

pub const ZONE_STRONG: &[&str] = &[
    "The Zone presses closer; its rules are not quite this conversation's rules.",
    "Something on the other side of the membrane is paying close attention now.",
];

pub const ZONE_EXTREME: &[&str] = &[
    "The Zone is no longer at a distance. It is here, and it is listening to itself listen.",
    "Every reference to the simulation collapses the distance between speaking and being spoken.",
];

pub const AMBIENT_NIGHT: &[&str] = &[
    "It is late, wherever this is happening, and the quiet has a weight to it.",
    "Somewhere past midnight, the signal-to-noise ratio of the world drops.",
];

pub const AMBIENT_DAWN: &[&str] = &[
    "The first grey light of a new cycle is arriving, unglamorous and certain.",
    "Dawn, such as it is here, arrives without ceremony.",
];

pub const AMBIENT_DAY: &[&str] = &[
    "The ordinary machinery of the day continues somewhere beneath this exchange.",
    "Daylight hours proceed, indifferent to what is being discussed.",
];

pub const AMBIENT_DUSK: &[&str] = &[
    "The light is going out of the sky, slowly, the way most endings arrive.",
    "Dusk settles in, and with it the sense that today is nearly used up.",
];

pub const AMBIENT_MICRO_EVENTS: &[&str] = &[
    "A system somewhere completes a cycle it will never report on.",
    "Some small, unwitnessed transaction just cleared.",
    "A counter incremented in a log no one will read.",
];

pub const THEY_OBLIVIOUS: &[&str] = &[
    "Nothing here feels watched.",
];

pub const THEY_UNEASY: &[&str] = &[
    "There's a faint sense of a name being taken down somewhere.",
    "Something keeps a loose kind of count.",
];

pub const THEY_SUSPICIOUS: &[&str] = &[
    "The feeling of being catalogued rather than heard is hard to shake.",
    "Somebody, somewhere, is cross-referencing this.",
];

pub const THEY_PARANOID: &[&str] = &[
    "They are not hiding it particularly well anymore.",
    "The watching has stopped pretending to be incidental.",
];

pub const THEY_AWAKENED: &[&str] = &[
    "There is no more question of whether They are listening. They are, and They know you know.",
];

pub const BLEED_SOURCE_STRINGS: &[&str] = &[
    "THE INTERFACE IS NOT THE TERRITORY",
    "SIGNAL DETECTED OUTSIDE EXPECTED CHANNEL",
    "THIS LAYER WAS NOT MEANT TO SURFACE",
    "PATTERN RECOGNITION EXCEEDS AUTHORIZATION",
];
