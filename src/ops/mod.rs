pub mod composite;
pub mod inpaint;
pub mod region;
