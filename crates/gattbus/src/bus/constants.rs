//! Bus names, interfaces and members used by the GATT object model

pub const BLUEZ_SERVICE: &str = "org.bluez";

pub const OBJECT_MANAGER_INTERFACE: &str = "org.freedesktop.DBus.ObjectManager";
pub const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";
pub const GATT_SERVICE_INTERFACE: &str = "org.bluez.GattService1";
pub const GATT_CHARACTERISTIC_INTERFACE: &str = "org.bluez.GattCharacteristic1";

// ObjectManager
pub const GET_MANAGED_OBJECTS: &str = "GetManagedObjects";

// Properties
pub const PROPERTIES_CHANGED: &str = "PropertiesChanged";
pub const PROPERTIES_CHANGED_SIGNATURE: &str = "(sa{sv}as)";

// GattCharacteristic1 methods
pub const READ_VALUE: &str = "ReadValue";
pub const WRITE_VALUE: &str = "WriteValue";
pub const START_NOTIFY: &str = "StartNotify";
pub const STOP_NOTIFY: &str = "StopNotify";
pub const CONFIRM: &str = "Confirm";

// Property names
pub const PROP_UUID: &str = "UUID";
pub const PROP_PRIMARY: &str = "Primary";
pub const PROP_DEVICE: &str = "Device";
pub const PROP_CHARACTERISTICS: &str = "Characteristics";
pub const PROP_INCLUDES: &str = "Includes";
pub const PROP_SERVICE: &str = "Service";
pub const PROP_VALUE: &str = "Value";
pub const PROP_NOTIFYING: &str = "Notifying";
pub const PROP_FLAGS: &str = "Flags";
pub const PROP_DESCRIPTORS: &str = "Descriptors";

// Option keys
pub const OPT_OFFSET: &str = "offset";
pub const OPT_TYPE: &str = "type";
