pub mod elevenlabs;
