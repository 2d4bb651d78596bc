pub mod FD_Newton;
