pub mod touch_controller;
